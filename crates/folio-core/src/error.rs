use thiserror::Error;

/// All errors that can occur in folio-core.
///
/// Structural defects in a well-formed document are never reported here; they
/// end up in a document's warning or error list instead.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML syntax error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

/// Why no structural map could be chosen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no candidate tables of contents")]
    NoCandidates,

    #[error("cannot determine which structural map to use")]
    Undecidable,
}

/// Exit codes used by the CLI.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    InvalidDocument = 4,
    ConfigError = 5,
}

pub type Result<T> = std::result::Result<T, FolioError>;
