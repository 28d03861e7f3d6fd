use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::{debug, warn};

use crate::config::ParserConfig;
use crate::error::{FolioError, Result};
use crate::mets::entities::EntityTable;
use crate::mets::frame::{has_ancestor, matches_ancestry, Frame};
use crate::models::{DivisionNode, FileDescriptor, FileDictionary, FileRole, StructuralMap};

pub const METS_NAMESPACE: &[u8] = b"http://www.loc.gov/METS/";

/// `FLocat` under `file` under `fileGrp` under `fileSec`, innermost first.
const FILE_LOCATION_CHAIN: [&str; 4] = ["FLocat", "file", "fileGrp", "fileSec"];

const METS_ELEMENTS: &[&str] = &[
    "mets",
    "metsHdr",
    "agent",
    "name",
    "note",
    "altRecordID",
    "metsDocumentID",
    "dmdSec",
    "amdSec",
    "techMD",
    "rightsMD",
    "sourceMD",
    "digiprovMD",
    "mdRef",
    "mdWrap",
    "xmlData",
    "binData",
    "fileSec",
    "fileGrp",
    "file",
    "FLocat",
    "FContent",
    "stream",
    "transformFile",
    "structMap",
    "div",
    "fptr",
    "mptr",
    "par",
    "seq",
    "area",
    "structLink",
    "smLink",
    "smLinkGrp",
    "smLocatorLink",
    "smArcLink",
    "behaviorSec",
    "behavior",
    "interfaceDef",
    "mechanism",
];

/// Everything one parse pass extracts from a METS document.
#[derive(Debug, Clone, Default)]
pub struct ParsedMets {
    pub label: String,
    pub files: FileDictionary,
    pub maps: Vec<StructuralMap>,
    pub alt_record_ids: Vec<String>,
    pub warnings: Vec<String>,
}

/// Single-use, stack-based reader for the file section and structural maps.
pub struct MetsParser<'a> {
    config: &'a ParserConfig,
    stack: Vec<Frame>,
    entities: EntityTable,
    text: String,
    label: String,
    files: FileDictionary,
    open_maps: Vec<StructuralMap>,
    maps: Vec<StructuralMap>,
    alt_record_ids: Vec<String>,
    unexpected: IndexMap<String, usize>,
}

impl<'a> MetsParser<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self {
            config,
            stack: Vec::new(),
            entities: EntityTable::new(),
            text: String::new(),
            label: String::new(),
            files: FileDictionary::new(),
            open_maps: Vec::new(),
            maps: Vec::new(),
            alt_record_ids: Vec::new(),
            unexpected: IndexMap::new(),
        }
    }

    /// Parse a complete document held in memory.
    ///
    /// Only XML syntax errors are returned as `Err`; anything odd but
    /// well-formed is tolerated and, where relevant, reported as a warning.
    pub fn parse(mut self, bytes: &[u8]) -> Result<ParsedMets> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        loop {
            let position = reader.buffer_position() as u64;
            let (namespace, event) = match reader.read_resolved_event() {
                Ok(resolved) => resolved,
                Err(source) => return Err(FolioError::Xml { position, source }),
            };
            let in_mets = is_mets_namespace(&namespace);

            match event {
                Event::Start(element) => {
                    self.open(in_mets, &element)
                        .map_err(|source| FolioError::Xml { position, source })?;
                }
                Event::Empty(element) => {
                    self.open(in_mets, &element)
                        .map_err(|source| FolioError::Xml { position, source })?;
                    self.close();
                }
                Event::End(_) => self.close(),
                Event::Text(text) => {
                    let unescaped = self.entities.unescape_lenient(&String::from_utf8_lossy(&text));
                    self.text.push_str(&unescaped);
                }
                Event::CData(data) => {
                    self.text.push_str(&String::from_utf8_lossy(&data));
                }
                Event::DocType(doctype) => {
                    self.entities = EntityTable::from_doctype(&String::from_utf8_lossy(&doctype));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(self.finish())
    }

    fn open(&mut self, in_mets: bool, element: &BytesStart<'_>) -> std::result::Result<(), quick_xml::Error> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let attrs = collect_attributes(element, &self.entities)?;
        let inside_xml_data = has_ancestor(&self.stack, "xmlData");

        self.text.clear();
        self.stack.push(Frame::new(name.clone(), in_mets, attrs));

        if self.config.trace {
            debug!(element = %name, depth = self.stack.len(), in_mets, "open element");
        }

        if inside_xml_data {
            return Ok(());
        }
        if !in_mets {
            let qualified = String::from_utf8_lossy(element.name().as_ref()).into_owned();
            self.note_unexpected(qualified);
            return Ok(());
        }

        match name.as_str() {
            "mets" if self.stack.len() == 1 => {
                if let Some(label) = self.current().attr("LABEL") {
                    self.label = clean_text(label);
                }
            }
            "FLocat" => {
                if matches_ancestry(&self.stack, &FILE_LOCATION_CHAIN) {
                    self.record_file();
                }
            }
            "structMap" => self.open_map(),
            "div" => self.open_division(),
            "fptr" => self.attach_file_pointer(),
            "area" => {
                if has_ancestor(&self.stack, "fptr") {
                    self.attach_file_pointer();
                }
            }
            other if METS_ELEMENTS.contains(&other) => {}
            other => self.note_unexpected(other.to_string()),
        }

        Ok(())
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        if self.config.trace {
            debug!(element = %frame.name, depth = self.stack.len(), "close element");
        }

        if frame.is("structMap") {
            if let Some(map) = self.open_maps.pop() {
                if self.config.trace {
                    debug!(divisions = map.divisions.len(), "sealed structMap");
                }
                self.maps.push(map);
            }
        } else if frame.is("altRecordID") {
            let value = clean_text(&self.text);
            if !value.is_empty() {
                self.alt_record_ids.push(value);
            }
        }

        self.text.clear();
    }

    fn current(&self) -> &Frame {
        // `open` pushes before dispatching, so the stack is never empty here.
        &self.stack[self.stack.len() - 1]
    }

    fn record_file(&mut self) {
        let depth = self.stack.len();
        let (group, file, location) = (
            &self.stack[depth - 3],
            &self.stack[depth - 2],
            &self.stack[depth - 1],
        );

        let Some(id) = file.attr("ID").map(str::trim).filter(|id| !id.is_empty()) else {
            return;
        };

        let descriptor = FileDescriptor {
            id: id.to_string(),
            sequence: file.attr("SEQ").and_then(|seq| seq.trim().parse().ok()),
            media_type: file.attr("MIMETYPE").unwrap_or_default().trim().to_lowercase(),
            role: FileRole::parse(group.attr("USE").unwrap_or_default()),
            href: location.attr("href").unwrap_or_default().trim().to_string(),
            group_id: file
                .attr("GROUPID")
                .map(str::trim)
                .filter(|group_id| !group_id.is_empty())
                .map(str::to_string),
        };

        if self.config.trace {
            debug!(id = %descriptor.id, href = %descriptor.href, "recorded file");
        }
        self.files.insert(descriptor);
    }

    fn open_map(&mut self) {
        let frame = self.current();
        let attr = |name: &str| frame.attr(name).map(clean_text).filter(|v| !v.is_empty());

        let map = StructuralMap {
            id: attr("ID"),
            kind: attr("TYPE"),
            label: attr("LABEL"),
            divisions: Vec::new(),
        };
        self.open_maps.push(map);
    }

    fn open_division(&mut self) {
        let level = self.stack.iter().filter(|frame| frame.is("div")).count() as u32;
        let frame = self.current();

        let title = frame
            .attr("LABEL")
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .or_else(|| frame.attr("ORDERLABEL").map(str::trim))
            .map(str::to_string)
            .unwrap_or_default();
        let is_page = frame
            .attr("TYPE")
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case(&self.config.page_type));

        let Some(map) = self.open_maps.last_mut() else {
            return;
        };
        map.divisions.push(DivisionNode::new(level, title, is_page));
        let index = map.divisions.len() - 1;

        if let Some(frame) = self.stack.last_mut() {
            frame.division = Some(index);
        }
    }

    fn attach_file_pointer(&mut self) {
        let Some(file_ids) = self.current().attr("FILEID").map(str::to_string) else {
            return;
        };
        let Some(index) = self.stack.iter().rev().find_map(|frame| frame.division) else {
            return;
        };
        let Some(division) = self
            .open_maps
            .last_mut()
            .and_then(|map| map.divisions.get_mut(index))
        else {
            return;
        };

        for id in file_ids.split_whitespace() {
            division.add_file_id(id);
        }
    }

    fn note_unexpected(&mut self, name: String) {
        *self.unexpected.entry(name).or_insert(0) += 1;
    }

    fn finish(self) -> ParsedMets {
        let mut warnings = Vec::new();

        if !self.unexpected.is_empty() {
            let total: usize = self.unexpected.values().sum();
            let names: Vec<String> = self
                .unexpected
                .iter()
                .map(|(name, count)| {
                    if *count > 1 {
                        format!("{name} (x{count})")
                    } else {
                        name.clone()
                    }
                })
                .collect();
            let message = format!(
                "ignored {total} unexpected element(s): {}",
                names.join(", ")
            );
            warn!("{message}");
            warnings.push(message);
        }

        let mut maps = self.maps;
        maps.extend(self.open_maps);
        for map in &mut maps {
            map.resolve(&self.files);
        }

        ParsedMets {
            label: self.label,
            files: self.files,
            maps,
            alt_record_ids: self.alt_record_ids,
            warnings,
        }
    }
}

/// Parse with a fresh parser.
pub fn parse_mets(bytes: &[u8], config: &ParserConfig) -> Result<ParsedMets> {
    MetsParser::new(config).parse(bytes)
}

fn is_mets_namespace(namespace: &ResolveResult<'_>) -> bool {
    match namespace {
        ResolveResult::Bound(Namespace(uri)) => *uri == METS_NAMESPACE,
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

fn collect_attributes(
    element: &BytesStart<'_>,
    entities: &EntityTable,
) -> std::result::Result<Vec<(String, String)>, quick_xml::Error> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = entities.unescape_lenient(&String::from_utf8_lossy(&attr.value));
        attrs.push((key, value));
    }
    Ok(attrs)
}

/// Collapse whitespace runs to single spaces and trim.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
