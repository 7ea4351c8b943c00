pub mod pubmed;

use pubcite_core::{Author, CitationRecord, Identifier};

use crate::assemble::{self, PrimaryMetadata, SecondaryMetadata};
use crate::error::Result;
use crate::extract::{Document, Field, RawField};
use crate::normalize::NormalizedField;

pub use pubmed::PubMedSource;

/// Whether a result page actually describes the article that was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// The source reported the query term as unknown; carries its notice text.
    NotFound(String),
}

/// Everything the batch runner needs from a citation source.
///
/// Implementors provide field lookup and normalization; the stage methods built on top of
/// them are shared by every source.
pub trait CitationSource: Send + Sync {
    fn name(&self) -> &str;

    /// Page URL for one identifier.
    fn query_url(&self, id: &Identifier) -> String;

    fn check_availability(&self, document: &dyn Document) -> Availability;

    /// Raw text the rule for `field` reads.
    fn extract(&self, document: &dyn Document, field: Field) -> RawField;

    fn normalize(&self, field: Field, raw: &RawField) -> Result<NormalizedField>;

    fn assemble(
        &self,
        authors: Vec<Author>,
        primary: PrimaryMetadata,
        secondary: SecondaryMetadata,
    ) -> Result<CitationRecord> {
        assemble::assemble(authors, primary, secondary)
    }

    fn normalize_from(&self, document: &dyn Document, field: Field) -> Result<NormalizedField> {
        let raw = self.extract(document, field);
        self.normalize(field, &raw)
    }

    /// Title, journal and identifiers. Identifiers the caller already knows are not looked up.
    fn extract_primary(&self, document: &dyn Document, id: &Identifier) -> Result<PrimaryMetadata> {
        let title = self
            .normalize_from(document, Field::Title)?
            .into_text(Field::Title)?;
        let journal = self
            .normalize_from(document, Field::Journal)?
            .into_text(Field::Journal)?;
        let pmid = match id.as_pmid() {
            Some(pmid) => Some(pmid.to_string()),
            None => self
                .normalize_from(document, Field::Pmid)?
                .into_identifier(Field::Pmid)?,
        };
        let doi = match id.as_doi() {
            Some(doi) => Some(doi.to_string()),
            None => self
                .normalize_from(document, Field::Doi)?
                .into_identifier(Field::Doi)?,
        };
        Ok(PrimaryMetadata {
            title,
            journal,
            pmid,
            doi,
        })
    }

    fn extract_secondary(&self, document: &dyn Document) -> Result<SecondaryMetadata> {
        Ok(SecondaryMetadata {
            issued: self.normalize_from(document, Field::Year)?.into_year()?,
            volume: self.normalize_from(document, Field::Volume)?.into_volume()?,
            pages: self.normalize_from(document, Field::Pages)?.into_pages()?,
        })
    }

    fn extract_authors(&self, document: &dyn Document) -> Result<Vec<Author>> {
        self.normalize_from(document, Field::Authors)?.into_authors()
    }
}
