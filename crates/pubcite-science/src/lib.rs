//! Pubcite Science: PubMed page extraction, field normalization, CSL-JSON output.

pub mod error;
pub mod http;
pub mod identifiers;
pub mod extract;
pub mod normalize;
pub mod assemble;
pub mod sources;
pub mod batch;
pub mod formats;

pub use error::{FailureKind, Result, ScienceError};
pub use batch::{
    BatchOutcome, BatchRunner, BatchSummary, FailureEntry, PageOutcome, Stage, extract_page,
};
pub use extract::{Document, Field, FieldSelector, HtmlDocument, RawField};
pub use http::{PageClient, PageFetcher};
pub use sources::{Availability, CitationSource, PubMedSource};
