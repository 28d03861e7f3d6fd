use serde::Serialize;

use super::file::{FileDescriptor, FileDictionary};

/// One `div` of a structural map, in document order.
///
/// Parent/child relations are carried only by `level`: the root division of a
/// map sits at level 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DivisionNode {
    pub level: u32,
    pub title: String,
    pub is_page: bool,
    pub file_ids: Vec<String>,
    pub files: Vec<FileDescriptor>,
}

impl DivisionNode {
    pub fn new(level: u32, title: impl Into<String>, is_page: bool) -> Self {
        Self {
            level,
            title: title.into(),
            is_page,
            file_ids: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Record a file pointer, ignoring ones already seen on this division.
    pub fn add_file_id(&mut self, id: &str) {
        if !self.file_ids.iter().any(|existing| existing == id) {
            self.file_ids.push(id.to_string());
        }
    }

    /// Join `file_ids` against the dictionary. Unknown ids are skipped.
    pub fn resolve(&mut self, dictionary: &FileDictionary) {
        self.files = self
            .file_ids
            .iter()
            .filter_map(|id| dictionary.get(id).cloned())
            .collect();
    }

    pub fn first_image(&self) -> Option<&FileDescriptor> {
        self.files.iter().find(|file| file.is_image())
    }

    /// Whether this division counts towards its map's file count.
    pub fn has_page_file(&self) -> bool {
        self.files
            .iter()
            .any(|file| file.is_image() || file.sequence.is_some())
    }
}

/// A `structMap` and its divisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuralMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    pub divisions: Vec<DivisionNode>,
}

impl StructuralMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_count(&self) -> usize {
        self.divisions
            .iter()
            .filter(|division| division.has_page_file())
            .count()
    }

    pub fn resolve(&mut self, dictionary: &FileDictionary) {
        for division in &mut self.divisions {
            division.resolve(dictionary);
        }
    }

    /// Human-facing name used in warnings; `position` is 0-based.
    pub fn describe(&self, position: usize) -> String {
        let mut name = format!("structMap {}", position + 1);
        let details: Vec<String> = [("id", &self.id), ("type", &self.kind), ("label", &self.label)]
            .into_iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
            .collect();
        if !details.is_empty() {
            name.push_str(&format!(" ({})", details.join(", ")));
        }
        name
    }
}
