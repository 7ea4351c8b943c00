use pubcite_core::{ARTICLE_TYPE, Author, CitationRecord, Issued, Pages};

use crate::error::{Result, ScienceError};

/// Title, journal and identifiers for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryMetadata {
    pub title: String,
    pub journal: String,
    pub pmid: Option<String>,
    pub doi: Option<String>,
}

/// Fields parsed from the composite citation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryMetadata {
    pub issued: Issued,
    pub volume: String,
    pub pages: Pages,
}

/// Combine normalized fields into a record.
///
/// Requires at least one author, a title and a year token. Nothing is filled in when they
/// are missing.
pub fn assemble(
    authors: Vec<Author>,
    primary: PrimaryMetadata,
    secondary: SecondaryMetadata,
) -> Result<CitationRecord> {
    let first = authors
        .first()
        .ok_or_else(|| ScienceError::Assembly("record has no authors".to_string()))?;
    if first.family.trim().is_empty() {
        return Err(ScienceError::Assembly(
            "first author has no family name".to_string(),
        ));
    }
    if primary.title.trim().is_empty() {
        return Err(ScienceError::Assembly("record has no title".to_string()));
    }
    let year = secondary
        .issued
        .year()
        .map(str::trim)
        .filter(|y| !y.is_empty())
        .ok_or_else(|| ScienceError::Assembly("record has no year".to_string()))?;

    let id = CitationRecord::derive_id(&first.family, year);
    Ok(CitationRecord {
        title: primary.title,
        item_type: ARTICLE_TYPE.to_string(),
        authors,
        issued: secondary.issued,
        journal: primary.journal,
        doi: primary.doi,
        pmid: primary.pmid,
        volume: secondary.volume,
        pages: secondary.pages,
        id,
    })
}
