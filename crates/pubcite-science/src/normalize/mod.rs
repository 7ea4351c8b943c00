//! Field normalization: raw matched text into typed citation values.
//!
//! Every rule is a plain function over a [`RawField`]. A source carries its rules as a
//! [`NormalizationRules`] table, so swapping one source's parsing for another's is a matter of
//! handing over a different table.

pub mod authors;
pub mod citation;

use std::collections::HashMap;

use pubcite_core::{Author, Issued, Pages};

use crate::error::{Result, ScienceError};
use crate::extract::{Field, RawField};
use crate::identifiers::Doi;

pub use authors::{normalize_authors, parse_author_name, strip_duplicate_listing};
pub use citation::{
    expand_truncated_stop, normalize_pages, normalize_volume, normalize_year, parse_pages,
    parse_volume,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedField {
    Authors(Vec<Author>),
    Title(String),
    Journal(String),
    /// Identifier echoed from the page; `None` when the page does not show one.
    Doi(Option<String>),
    Pmid(Option<String>),
    Year(Issued),
    Volume(String),
    Pages(Pages),
}

impl NormalizedField {
    fn variant(&self) -> &'static str {
        match self {
            Self::Authors(_) => "authors",
            Self::Title(_) => "title",
            Self::Journal(_) => "journal",
            Self::Doi(_) => "doi",
            Self::Pmid(_) => "pmid",
            Self::Year(_) => "year",
            Self::Volume(_) => "volume",
            Self::Pages(_) => "pages",
        }
    }

    fn mismatch(self, expected: Field) -> ScienceError {
        ScienceError::Parse(format!(
            "rule for {expected} produced a {} value",
            self.variant()
        ))
    }

    pub fn into_authors(self) -> Result<Vec<Author>> {
        match self {
            Self::Authors(authors) => Ok(authors),
            other => Err(other.mismatch(Field::Authors)),
        }
    }

    /// Title or journal text.
    pub fn into_text(self, expected: Field) -> Result<String> {
        match (self, expected) {
            (Self::Title(text), Field::Title) | (Self::Journal(text), Field::Journal) => Ok(text),
            (other, _) => Err(other.mismatch(expected)),
        }
    }

    pub fn into_identifier(self, expected: Field) -> Result<Option<String>> {
        match (self, expected) {
            (Self::Doi(id), Field::Doi) | (Self::Pmid(id), Field::Pmid) => Ok(id),
            (other, _) => Err(other.mismatch(expected)),
        }
    }

    pub fn into_year(self) -> Result<Issued> {
        match self {
            Self::Year(issued) => Ok(issued),
            other => Err(other.mismatch(Field::Year)),
        }
    }

    pub fn into_volume(self) -> Result<String> {
        match self {
            Self::Volume(volume) => Ok(volume),
            other => Err(other.mismatch(Field::Volume)),
        }
    }

    pub fn into_pages(self) -> Result<Pages> {
        match self {
            Self::Pages(pages) => Ok(pages),
            other => Err(other.mismatch(Field::Pages)),
        }
    }
}

pub type NormalizeFn = fn(&RawField) -> Result<NormalizedField>;

/// A normalization rule and the raw field it reads.
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub reads: Field,
    pub normalize: NormalizeFn,
}

#[derive(Clone, Default)]
pub struct NormalizationRules {
    rules: HashMap<Field, FieldRule>,
}

impl NormalizationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for pages that expose each field through its own selector plus a composite
    /// citation string for year, volume and pages.
    pub fn standard() -> Self {
        Self::new()
            .with(Field::Authors, Field::Authors, normalize_authors)
            .with(Field::Title, Field::Title, normalize_title)
            .with(Field::Journal, Field::Journal, normalize_journal)
            .with(Field::Doi, Field::Doi, normalize_doi)
            .with(Field::Pmid, Field::Pmid, normalize_pmid)
            .with(Field::Year, Field::Citation, normalize_year)
            .with(Field::Volume, Field::Citation, normalize_volume)
            .with(Field::Pages, Field::Citation, normalize_pages)
    }

    pub fn with(mut self, field: Field, reads: Field, normalize: NormalizeFn) -> Self {
        self.rules.insert(field, FieldRule { reads, normalize });
        self
    }

    pub fn get(&self, field: Field) -> Option<&FieldRule> {
        self.rules.get(&field)
    }

    /// The raw field the rule for `field` reads; a field without a rule reads itself.
    pub fn reads(&self, field: Field) -> Field {
        self.get(field).map_or(field, |rule| rule.reads)
    }

    pub fn apply(&self, field: Field, raw: &RawField) -> Result<NormalizedField> {
        let rule = self
            .get(field)
            .ok_or_else(|| ScienceError::Parse(format!("no normalization rule for {field}")))?;
        (rule.normalize)(raw)
    }
}

pub fn normalize_title(raw: &RawField) -> Result<NormalizedField> {
    raw.require().map(|t| NormalizedField::Title(t.trim().to_string()))
}

pub fn normalize_journal(raw: &RawField) -> Result<NormalizedField> {
    raw.require().map(|j| NormalizedField::Journal(j.trim().to_string()))
}

/// DOI as printed on the page. Falls back to the cleaned label when it does not parse.
pub fn normalize_doi(raw: &RawField) -> Result<NormalizedField> {
    let doi = raw.first().map(|label| match Doi::from_page_label(label) {
        Ok(doi) => doi.normalized,
        Err(_) => label.trim().trim_end_matches('.').to_string(),
    });
    Ok(NormalizedField::Doi(doi.filter(|d| !d.is_empty())))
}

pub fn normalize_pmid(raw: &RawField) -> Result<NormalizedField> {
    Ok(NormalizedField::Pmid(raw.first().map(|p| p.trim().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(field: Field, fragments: &[&str]) -> RawField {
        RawField::new(field, "sel", fragments.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn standard_rules_read_citation_for_derived_fields() {
        let rules = NormalizationRules::standard();
        assert_eq!(rules.reads(Field::Year), Field::Citation);
        assert_eq!(rules.reads(Field::Pages), Field::Citation);
        assert_eq!(rules.reads(Field::Title), Field::Title);
        assert_eq!(rules.reads(Field::QueryNotice), Field::QueryNotice);
    }

    #[test]
    fn apply_dispatches_to_the_bound_rule() {
        let rules = NormalizationRules::standard();
        let volume = rules
            .apply(Field::Volume, &raw(Field::Citation, &["2019 Jan;12(3):145-52."]))
            .unwrap();
        assert_eq!(volume.into_volume().unwrap(), "12");
    }

    #[test]
    fn rules_can_be_replaced() {
        fn shout(raw: &RawField) -> Result<NormalizedField> {
            raw.require().map(|t| NormalizedField::Title(t.to_uppercase()))
        }
        let rules = NormalizationRules::standard().with(Field::Title, Field::Title, shout);
        let title = rules.apply(Field::Title, &raw(Field::Title, &["quiet"])).unwrap();
        assert_eq!(title.into_text(Field::Title).unwrap(), "QUIET");
    }

    #[test]
    fn missing_rule_is_reported() {
        let rules = NormalizationRules::new();
        assert!(rules.apply(Field::Title, &raw(Field::Title, &["x"])).is_err());
    }

    #[test]
    fn title_requires_a_match() {
        let err = normalize_title(&raw(Field::Title, &[])).unwrap_err();
        assert!(matches!(err, ScienceError::MissingField { .. }));
    }

    #[test]
    fn doi_echo_is_cleaned() {
        let field = normalize_doi(&raw(Field::Doi, &["doi: 10.1038/S41586-020-2649-2."])).unwrap();
        assert_eq!(
            field,
            NormalizedField::Doi(Some("10.1038/s41586-020-2649-2".into()))
        );
        assert_eq!(
            normalize_doi(&raw(Field::Doi, &[])).unwrap(),
            NormalizedField::Doi(None)
        );
    }

    #[test]
    fn mismatched_variant_is_a_parse_error() {
        let err = NormalizedField::Volume("1".into())
            .into_text(Field::Title)
            .unwrap_err();
        assert!(matches!(err, ScienceError::Parse(_)));
    }
}
