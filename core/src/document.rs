use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of corpus record. `page` records carry prose for a whole page; every
/// other kind is an anchor inside a page (headings, and docstring anchors such
/// as `type` or `function` emitted by API doc generators).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Page,
    Section,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Page => "page",
            Self::Section => "section",
            Self::Other(name) => name,
        }
    }

    pub fn is_page(&self) -> bool { matches!(self, Self::Page) }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "page" => Self::Page,
            "section" => Self::Section,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self { Self::from(raw.to_string()) }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One corpus record as produced by the static-site content extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub text: String,
}

impl Document {
    pub fn new(
        location: impl Into<String>,
        page: impl Into<String>,
        title: impl Into<String>,
        category: impl Into<Category>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            page: page.into(),
            title: title.into(),
            category: category.into(),
            text: text.into(),
        }
    }

    pub fn page(location: impl Into<String>, page: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(location, page, title, Category::Page, text)
    }

    /// A heading marker with no body of its own.
    pub fn section(location: impl Into<String>, page: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(location, page, title, Category::Section, String::new())
    }
}
