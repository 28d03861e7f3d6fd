//! Builds page-turner tables of contents from METS structural maps.
//!
//! [`MetsDocument`] is the entry point: it validates a document, reads its
//! file inventory and structural maps, picks one map and normalizes it into a
//! flat list of chapters and pages.

pub mod config;
pub mod document;
pub mod error;
pub mod mets;
pub mod models;
pub mod normalize;
pub mod render;
pub mod select;
pub mod validate;

pub use config::{FolioConfig, OutputConfig, ParserConfig, SchemaConfig};
pub use document::MetsDocument;
pub use error::{ExitCode, FolioError, Result, SelectionError};
pub use models::*;

pub use normalize::TocNormalizer;
pub use render::{render_outline, EntryKind, TableOfContents, TocItem};
pub use select::StructMapSelector;
pub use validate::{Diagnostic, SchemaValidator, Severity, ValidationReport, WellFormednessValidator};
