use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static IMAGE_MEDIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^image/").expect("valid image media type regex"));
static TEXT_MEDIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^text/").expect("valid text media type regex"));

pub fn is_image_media(media_type: &str) -> bool {
    IMAGE_MEDIA_RE.is_match(media_type)
}

pub fn is_text_media(media_type: &str) -> bool {
    TEXT_MEDIA_RE.is_match(media_type)
}

/// What a file group is used for, from the group's `USE` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileRole {
    Archive,
    Reference,
    Thumbnail,
    Index,
    Other(String),
}

impl FileRole {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "archive" => Self::Archive,
            "reference" => Self::Reference,
            "thumbnail" => Self::Thumbnail,
            "index" => Self::Index,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Archive => "archive",
            Self::Reference => "reference",
            Self::Thumbnail => "thumbnail",
            Self::Index => "index",
            Self::Other(other) => other,
        }
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FileRole {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FileRole> for String {
    fn from(value: FileRole) -> Self {
        value.as_str().to_string()
    }
}

/// One physical file from the document's file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,

    pub media_type: String,
    pub role: FileRole,
    pub href: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl FileDescriptor {
    pub fn is_image(&self) -> bool {
        is_image_media(&self.media_type)
    }

    pub fn is_text(&self) -> bool {
        is_text_media(&self.media_type)
    }

    /// Last path segment of the location.
    pub fn filename(&self) -> &str {
        self.href
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.href.as_str())
    }
}

/// Identifier-keyed file registry in document order.
///
/// Re-inserting an identifier replaces the descriptor but keeps the position
/// of the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FileDictionary {
    files: IndexMap<String, FileDescriptor>,
}

impl FileDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: FileDescriptor) {
        self.files.insert(file.id.clone(), file);
    }

    pub fn get(&self, id: &str) -> Option<&FileDescriptor> {
        self.files.get(id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileDescriptor> {
        self.files.values()
    }
}

impl<'a> IntoIterator for &'a FileDictionary {
    type Item = &'a FileDescriptor;
    type IntoIter = indexmap::map::Values<'a, String, FileDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.values()
    }
}
