//! Field extraction: applying a selector to a parsed page and collecting matched text.

use std::fmt;

use scraper::{Html, Selector};
use serde::Serialize;

use crate::error::{Result, ScienceError};

/// Semantic fields a source knows how to locate or derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Authors,
    Title,
    Journal,
    Doi,
    Pmid,
    /// Composite citation string carrying year, volume, issue and pages.
    Citation,
    Year,
    Volume,
    Pages,
    /// Banner the source shows when a search term was not recognized.
    QueryNotice,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authors => "authors",
            Self::Title => "title",
            Self::Journal => "journal",
            Self::Doi => "doi",
            Self::Pmid => "pmid",
            Self::Citation => "citation",
            Self::Year => "year",
            Self::Volume => "volume",
            Self::Pages => "pages",
            Self::QueryNotice => "query_notice",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled CSS selector bound to the field it locates.
#[derive(Debug, Clone)]
pub struct FieldSelector {
    field: Field,
    query: String,
    compiled: Selector,
}

impl FieldSelector {
    pub fn new(field: Field, query: &str) -> Result<Self> {
        let compiled = Selector::parse(query)
            .map_err(|e| ScienceError::Parse(format!("invalid selector {query}: {e}")))?;
        Ok(Self {
            field,
            query: query.to_string(),
            compiled,
        })
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn compiled(&self) -> &Selector {
        &self.compiled
    }
}

/// A page that can answer structural queries.
pub trait Document {
    /// Text of every element matching `selector`, in document order.
    fn select_text(&self, selector: &FieldSelector) -> Vec<String>;
}

pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }
}

impl Document for HtmlDocument {
    fn select_text(&self, selector: &FieldSelector) -> Vec<String> {
        self.html
            .select(selector.compiled())
            .map(|el| el.text().collect::<String>())
            .collect()
    }
}

/// Unprocessed text matched by one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub field: Field,
    pub selector: String,
    fragments: Vec<String>,
}

impl RawField {
    pub fn new(field: Field, selector: impl Into<String>, fragments: Vec<String>) -> Self {
        Self {
            field,
            selector: selector.into(),
            fragments,
        }
    }

    /// A field the source has no selector for.
    pub fn unbound(field: Field) -> Self {
        Self::new(field, "<none>", Vec::new())
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn first(&self) -> Option<&str> {
        self.fragments.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// First fragment, or `MissingField` naming the selector.
    pub fn require(&self) -> Result<&str> {
        self.first().ok_or_else(|| ScienceError::MissingField {
            field: self.field.to_string(),
            selector: self.selector.clone(),
        })
    }
}

/// Apply `selector` to `document`, trimming each match.
///
/// Matches that are blank after trimming are dropped, so list fields (authors) only
/// count elements that carry text.
pub fn extract(document: &dyn Document, selector: &FieldSelector) -> RawField {
    let fragments = document
        .select_text(selector)
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();
    RawField::new(selector.field(), selector.query(), fragments)
}
