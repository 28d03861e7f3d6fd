use std::path::Path;

use tracing::{debug, info};

use crate::config::{FolioConfig, ParserConfig};
use crate::error::{FolioError, Result};
use crate::mets::parse_mets;
use crate::models::{FileDictionary, StructuralMap, TocEntry};
use crate::normalize::TocNormalizer;
use crate::render::{render_outline, TableOfContents};
use crate::select::StructMapSelector;
use crate::validate::{SchemaValidator, Severity};

/// A METS document reduced to what a page-turning viewer needs.
#[derive(Debug, Clone, Default)]
pub struct MetsDocument {
    label: String,
    files: FileDictionary,
    maps: Vec<StructuralMap>,
    selected: Option<usize>,
    entries: Vec<TocEntry>,
    alt_record_ids: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl MetsDocument {
    /// Read a file, validate it, then build its table of contents.
    pub fn open(
        path: &Path,
        validator: &dyn SchemaValidator,
        config: &FolioConfig,
    ) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load(&bytes, validator, config)
    }

    /// Validate with `validator` first. An invalid report short-circuits:
    /// the document stays empty and its diagnostics become errors.
    pub fn load(
        bytes: &[u8],
        validator: &dyn SchemaValidator,
        config: &FolioConfig,
    ) -> Result<Self> {
        let report = validator.validate(bytes, &config.schema_path());
        if !report.valid {
            let mut document = Self::default();
            for diagnostic in report.diagnostics {
                let message = format!("line {}: {}", diagnostic.line, diagnostic.message);
                match diagnostic.severity {
                    Severity::Warning => document.warnings.push(message),
                    Severity::Error | Severity::Fatal => document.errors.push(message),
                }
            }
            if document.errors.is_empty() {
                document.errors.push("document failed schema validation".to_string());
            }
            info!(errors = document.errors.len(), "schema validation failed");
            return Ok(document);
        }

        let mut document = Self::parse(bytes, &config.parser)?;
        let diagnostics = report
            .diagnostics
            .into_iter()
            .map(|d| format!("line {}: {}", d.line, d.message));
        document.warnings.splice(0..0, diagnostics);
        Ok(document)
    }

    /// Parse, select and normalize without consulting a validator.
    ///
    /// Fails only on malformed XML.
    pub fn parse(bytes: &[u8], config: &ParserConfig) -> Result<Self> {
        let parsed = parse_mets(bytes, config)?;
        let mut document = Self {
            label: parsed.label,
            files: parsed.files,
            maps: parsed.maps,
            alt_record_ids: parsed.alt_record_ids,
            warnings: parsed.warnings,
            ..Self::default()
        };

        let mut selector = StructMapSelector::new();
        let selection = selector.select(&document.maps);
        document.warnings.extend(selector.into_warnings());

        let index = match selection {
            Ok(index) => index,
            Err(e) => {
                document.errors.push(e.to_string());
                return Ok(document);
            }
        };
        debug!(index, maps = document.maps.len(), "selected structural map");

        let mut normalizer = TocNormalizer::new();
        let entries = normalizer.normalize(&document.maps[index], &document.files);
        if !normalizer.is_valid() {
            document
                .errors
                .push("selected structural map has no divisions".to_string());
        }
        document.warnings.extend(normalizer.into_warnings());
        document.selected = Some(index);
        document.entries = entries;

        Ok(document)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && !self.entries.is_empty()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn files(&self) -> &FileDictionary {
        &self.files
    }

    pub fn alt_record_ids(&self) -> &[String] {
        &self.alt_record_ids
    }

    pub fn structural_maps(&self) -> &[StructuralMap] {
        &self.maps
    }

    pub fn selected_map(&self) -> Option<&StructuralMap> {
        self.selected.and_then(|index| self.maps.get(index))
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn table_of_contents(&self) -> TableOfContents {
        TableOfContents::new(&self.label, &self.entries)
    }

    pub fn outline(&self) -> String {
        render_outline(&self.label, &self.entries)
    }

    /// Like [`table_of_contents`](Self::table_of_contents), but refuses an
    /// invalid document.
    pub fn require_table_of_contents(&self) -> Result<TableOfContents> {
        if !self.is_valid() {
            let reason = self
                .errors
                .first()
                .cloned()
                .unwrap_or_else(|| "empty table of contents".to_string());
            return Err(FolioError::InvalidDocument(reason));
        }
        Ok(self.table_of_contents())
    }
}
