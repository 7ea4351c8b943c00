use std::collections::HashMap;

use pubcite_core::Identifier;
use tracing::debug;

use crate::error::Result;
use crate::extract::{self, Document, Field, FieldSelector, RawField};
use crate::normalize::{NormalizationRules, NormalizedField};
use crate::sources::{Availability, CitationSource};

pub const DEFAULT_QUERY_URL: &str = "https://pubmed.ncbi.nlm.nih.gov/?term={id}";

const PUBMED_SELECTORS: &[(Field, &str)] = &[
    (Field::Authors, "div.authors-list > span > a"),
    (Field::Title, "h1.heading-title"),
    (Field::Journal, "button.journal-actions-trigger.trigger"),
    (Field::Doi, "span.citation-doi"),
    (Field::Pmid, "strong.current-id"),
    (Field::Citation, "span.cit"),
    (
        Field::QueryNotice,
        "em.altered-search-explanation.query-error-message",
    ),
];

const NOT_FOUND_MARKERS: &[&str] = &["term was not found", "term was ignored"];

/// PubMed search pages. A search for a single DOI or PMID lands directly on the article.
pub struct PubMedSource {
    query_url: String,
    selectors: HashMap<Field, FieldSelector>,
    rules: NormalizationRules,
}

impl PubMedSource {
    pub fn new() -> Result<Self> {
        Self::with_query_url(DEFAULT_QUERY_URL)
    }

    /// `query_url` may carry an `{id}` placeholder; otherwise the identifier is appended.
    pub fn with_query_url(query_url: &str) -> Result<Self> {
        let selectors = PUBMED_SELECTORS
            .iter()
            .map(|(field, query)| FieldSelector::new(*field, query).map(|sel| (*field, sel)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self {
            query_url: query_url.to_string(),
            selectors,
            rules: NormalizationRules::standard(),
        })
    }

    pub fn with_rules(mut self, rules: NormalizationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn selector(&self, field: Field) -> Option<&FieldSelector> {
        self.selectors.get(&field)
    }
}

impl CitationSource for PubMedSource {
    fn name(&self) -> &str {
        "pubmed"
    }

    fn query_url(&self, id: &Identifier) -> String {
        // Quoted so PubMed runs an exact-term search.
        let term = format!("%22{}%22", urlencoding::encode(id.value()));
        if self.query_url.contains("{id}") {
            self.query_url.replace("{id}", &term)
        } else {
            format!("{}{}", self.query_url, term)
        }
    }

    fn check_availability(&self, document: &dyn Document) -> Availability {
        let notice = self.extract(document, Field::QueryNotice);
        match notice
            .fragments()
            .iter()
            .find(|text| NOT_FOUND_MARKERS.iter().any(|m| text.contains(m)))
        {
            Some(text) => Availability::NotFound(text.clone()),
            None => Availability::Available,
        }
    }

    fn extract(&self, document: &dyn Document, field: Field) -> RawField {
        let reads = self.rules.reads(field);
        match self.selectors.get(&reads) {
            Some(selector) => extract::extract(document, selector),
            None => {
                debug!(field = %field, "no selector bound");
                RawField::unbound(reads)
            }
        }
    }

    fn normalize(&self, field: Field, raw: &RawField) -> Result<NormalizedField> {
        self.rules.apply(field, raw)
    }
}

#[cfg(test)]
mod tests {
    use pubcite_core::{Author, Issued, Pages};

    use super::*;
    use crate::error::ScienceError;
    use crate::extract::HtmlDocument;

    fn source() -> PubMedSource {
        PubMedSource::new().unwrap()
    }

    fn article() -> HtmlDocument {
        HtmlDocument::parse(include_str!("fixtures/pubmed_article.html"))
    }

    #[test]
    fn query_url_quotes_and_encodes_identifier() {
        let doi = Identifier::doi("10.1038/s41593-018-0001-x").unwrap();
        assert_eq!(
            source().query_url(&doi),
            "https://pubmed.ncbi.nlm.nih.gov/?term=%2210.1038%2Fs41593-018-0001-x%22"
        );

        let appended = PubMedSource::with_query_url("http://127.0.0.1:9/search?term=").unwrap();
        let pmid = Identifier::pmid("30559365").unwrap();
        assert_eq!(
            appended.query_url(&pmid),
            "http://127.0.0.1:9/search?term=%2230559365%22"
        );
    }

    #[test]
    fn article_page_is_available() {
        assert_eq!(source().check_availability(&article()), Availability::Available);
    }

    #[test]
    fn not_found_notice_is_detected() {
        let doc = HtmlDocument::parse(include_str!("fixtures/pubmed_not_found.html"));
        match source().check_availability(&doc) {
            Availability::NotFound(text) => assert!(text.contains("10.9999/does-not-exist")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_notice_does_not_hide_the_article() {
        let doc = HtmlDocument::parse(
            r#"<em class="altered-search-explanation query-error-message">Showing results for a corrected spelling.</em>"#,
        );
        assert_eq!(source().check_availability(&doc), Availability::Available);
    }

    #[test]
    fn primary_metadata_echoes_page_pmid_for_doi_queries() {
        let id = Identifier::doi("10.1038/s41593-018-0001-x").unwrap();
        let primary = source().extract_primary(&article(), &id).unwrap();
        assert_eq!(primary.title, "Sleep spindles and overnight memory consolidation");
        assert_eq!(primary.journal, "Nat Neurosci");
        assert_eq!(primary.pmid.as_deref(), Some("30559365"));
        assert_eq!(primary.doi.as_deref(), Some("10.1038/s41593-018-0001-x"));
    }

    #[test]
    fn primary_metadata_echoes_page_doi_for_pmid_queries() {
        let id = Identifier::pmid("30559365").unwrap();
        let primary = source().extract_primary(&article(), &id).unwrap();
        assert_eq!(primary.doi.as_deref(), Some("10.1038/s41593-018-0001-x"));
        assert_eq!(primary.pmid.as_deref(), Some("30559365"));
    }

    #[test]
    fn caller_identifier_wins_over_page() {
        let id = Identifier::pmid("11111111").unwrap();
        let primary = source().extract_primary(&article(), &id).unwrap();
        assert_eq!(primary.pmid.as_deref(), Some("11111111"));
    }

    #[test]
    fn secondary_metadata_from_citation_string() {
        let secondary = source().extract_secondary(&article()).unwrap();
        assert_eq!(secondary.issued, Issued::from_year("2019"));
        assert_eq!(secondary.volume, "12");
        assert_eq!(secondary.pages, Pages::range("145", "152"));
    }

    #[test]
    fn authors_from_duplicated_listing() {
        let authors = source().extract_authors(&article()).unwrap();
        assert_eq!(
            authors,
            vec![Author::new("Garcia", "Maria"), Author::new("Smith", "John A")]
        );
    }

    #[test]
    fn full_record_from_fixture() {
        let id = Identifier::doi("10.1038/s41593-018-0001-x").unwrap();
        let src = source();
        let doc = article();
        let record = src
            .assemble(
                src.extract_authors(&doc).unwrap(),
                src.extract_primary(&doc, &id).unwrap(),
                src.extract_secondary(&doc).unwrap(),
            )
            .unwrap();
        assert_eq!(record.id, "garcia2019");
        assert_eq!(record.pages.render(), "145-152");
    }

    #[test]
    fn missing_title_names_the_selector() {
        let doc = HtmlDocument::parse("<html><body><span class=\"cit\">2020;1:1-2.</span></body></html>");
        let id = Identifier::pmid("1").unwrap();
        let err = source().extract_primary(&doc, &id).unwrap_err();
        assert!(matches!(
            err,
            ScienceError::MissingField { ref selector, .. } if selector == "h1.heading-title"
        ));
    }

    #[test]
    fn missing_citation_is_secondary_metadata_error() {
        let doc = HtmlDocument::parse("<html><body><h1 class=\"heading-title\">T</h1></body></html>");
        let err = source().extract_secondary(&doc).unwrap_err();
        assert!(matches!(err, ScienceError::SecondaryMetadata { .. }));
    }
}
