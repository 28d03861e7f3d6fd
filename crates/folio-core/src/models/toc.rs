use serde::{Deserialize, Serialize};

/// The image a page is displayed with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageImage {
    pub filename: String,
    pub media_type: String,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub level: u32,
    pub pagenum: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub level: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PageImage>,

    pub pagenum: u32,

    /// Another page further on shows the same file.
    #[serde(default)]
    pub is_repeat: bool,
}

impl Page {
    pub fn file_id(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.file_id.as_str())
    }
}

/// One line of a linear table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TocEntry {
    Chapter(Chapter),
    Page(Page),
}

impl TocEntry {
    pub fn chapter(title: impl Into<String>, level: u32) -> Self {
        Self::Chapter(Chapter {
            title: title.into(),
            level,
            pagenum: 0,
        })
    }

    pub fn page(title: impl Into<String>, level: u32, image: Option<PageImage>) -> Self {
        Self::Page(Page {
            title: title.into(),
            level,
            image,
            pagenum: 0,
            is_repeat: false,
        })
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Chapter(chapter) => &chapter.title,
            Self::Page(page) => &page.title,
        }
    }

    pub fn level(&self) -> u32 {
        match self {
            Self::Chapter(chapter) => chapter.level,
            Self::Page(page) => page.level,
        }
    }

    pub fn pagenum(&self) -> u32 {
        match self {
            Self::Chapter(chapter) => chapter.pagenum,
            Self::Page(page) => page.pagenum,
        }
    }

    pub fn is_page(&self) -> bool {
        matches!(self, Self::Page(_))
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Self::Page(page) => Some(page),
            Self::Chapter(_) => None,
        }
    }

    pub(crate) fn level_mut(&mut self) -> &mut u32 {
        match self {
            Self::Chapter(chapter) => &mut chapter.level,
            Self::Page(page) => &mut page.level,
        }
    }
}
