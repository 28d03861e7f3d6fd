//! Output shapes for a normalized table of contents.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::TocEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Chapter,
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub title: String,
    pub level: u32,
    pub pagenum: u32,
}

impl From<&TocEntry> for TocItem {
    fn from(entry: &TocEntry) -> Self {
        let kind = match entry {
            TocEntry::Chapter(_) => EntryKind::Chapter,
            TocEntry::Page(_) => EntryKind::Page,
        };
        Self {
            kind,
            title: entry.title().to_string(),
            level: entry.level(),
            pagenum: entry.pagenum(),
        }
    }
}

/// `{ "title"?: ..., "table_of_contents"?: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOfContents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_of_contents: Vec<TocItem>,
}

impl TableOfContents {
    pub fn new(label: &str, entries: &[TocEntry]) -> Self {
        let label = label.trim();
        Self {
            title: (!label.is_empty()).then(|| label.to_string()),
            table_of_contents: entries.iter().map(TocItem::from).collect(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Plain-text outline, one line per entry.
///
/// Chapters are starred once per level; pages are indented under them and
/// carry their page number.
pub fn render_outline(label: &str, entries: &[TocEntry]) -> String {
    let mut out = String::new();
    let label = label.trim();
    if !label.is_empty() {
        out.push_str(label);
        out.push('\n');
    }

    for entry in entries {
        match entry {
            TocEntry::Chapter(chapter) => {
                out.push_str(&"*".repeat(chapter.level.max(1) as usize));
                out.push(' ');
                out.push_str(&chapter.title);
            }
            TocEntry::Page(page) => {
                out.push_str(&"  ".repeat(page.level.saturating_sub(1) as usize));
                out.push_str("- ");
                out.push_str(&page.title);
                out.push_str(&format!(" [p. {}]", page.pagenum));
                if page.is_repeat {
                    out.push_str(" (repeat)");
                }
            }
        }
        out.push('\n');
    }

    out
}
