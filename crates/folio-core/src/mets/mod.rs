//! Event-driven reader for METS package documents.

pub mod entities;
pub mod frame;
pub mod parser;

pub use entities::EntityTable;
pub use frame::{matches_ancestry, Frame};
pub use parser::{clean_text, parse_mets, MetsParser, ParsedMets, METS_NAMESPACE};
