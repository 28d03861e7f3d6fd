//! The schema-validation oracle consulted before a document is read.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::mets::EntityTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based; 0 when the position is unknown.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.message, self.severity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn invalid(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            valid: false,
            diagnostics,
        }
    }
}

/// Anything that can tell whether a document conforms to a schema.
pub trait SchemaValidator {
    fn validate(&self, bytes: &[u8], schema_path: &Path) -> ValidationReport;
}

/// Checks well-formedness only. The schema path is not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormednessValidator;

impl SchemaValidator for WellFormednessValidator {
    fn validate(&self, bytes: &[u8], _schema_path: &Path) -> ValidationReport {
        let mut reader = Reader::from_reader(bytes);
        let mut entities = EntityTable::new();
        let mut depth = 0usize;
        let mut saw_root = false;

        loop {
            let position = reader.buffer_position() as usize;
            let checked = match reader.read_event() {
                Ok(Event::Start(element)) => {
                    depth += 1;
                    saw_root = true;
                    check_attributes(&element, &entities)
                }
                Ok(Event::Empty(element)) => {
                    saw_root = true;
                    check_attributes(&element, &entities)
                }
                Ok(Event::End(_)) => {
                    depth = depth.saturating_sub(1);
                    Ok(())
                }
                Ok(Event::Text(text)) => entities
                    .try_unescape(&String::from_utf8_lossy(&text))
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Ok(Event::DocType(doctype)) => {
                    entities = EntityTable::from_doctype(&String::from_utf8_lossy(&doctype));
                    Ok(())
                }
                Ok(Event::Eof) => break,
                Ok(_) => Ok(()),
                Err(e) => {
                    let position = reader.error_position() as usize;
                    return ValidationReport::invalid(vec![Diagnostic {
                        severity: Severity::Fatal,
                        line: line_of(bytes, position),
                        message: e.to_string(),
                    }]);
                }
            };

            if let Err(message) = checked {
                return ValidationReport::invalid(vec![Diagnostic {
                    severity: Severity::Fatal,
                    line: line_of(bytes, position),
                    message,
                }]);
            }
        }

        if !saw_root {
            return ValidationReport::invalid(vec![Diagnostic {
                severity: Severity::Fatal,
                line: 0,
                message: "document has no root element".to_string(),
            }]);
        }
        if depth > 0 {
            return ValidationReport::invalid(vec![Diagnostic {
                severity: Severity::Fatal,
                line: line_of(bytes, bytes.len()),
                message: format!("{depth} element(s) left open at end of document"),
            }]);
        }

        ValidationReport::valid()
    }
}

/// Attributes must be well-formed and reference only known entities.
fn check_attributes(element: &BytesStart<'_>, entities: &EntityTable) -> Result<(), String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        entities
            .try_unescape(&String::from_utf8_lossy(&attr.value))
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn line_of(bytes: &[u8], position: usize) -> usize {
    let end = position.min(bytes.len());
    bytes[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
