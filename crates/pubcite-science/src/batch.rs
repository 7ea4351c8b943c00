//! Batch orchestration: one pass of fetch, availability check, extraction and assembly per
//! identifier, with every per-identifier failure recorded instead of aborting the run.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pubcite_core::{CitationRecord, Identifier, IdentifierBatch};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{FailureKind, ScienceError};
use crate::extract::{Document, Field, HtmlDocument};
use crate::http::PageFetcher;
use crate::sources::{Availability, CitationSource};

/// Pipeline stage an identifier was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    CheckAvailability,
    ExtractPrimary,
    ExtractSecondary,
    ExtractAuthors,
    Assemble,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::CheckAvailability => "check_availability",
            Self::ExtractPrimary => "extract_primary",
            Self::ExtractSecondary => "extract_secondary",
            Self::ExtractAuthors => "extract_authors",
            Self::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{stage}: {error}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: ScienceError,
}

fn at<T>(stage: Stage, result: crate::error::Result<T>) -> Result<T, StageError> {
    result.map_err(|error| StageError { stage, error })
}

/// What one page produced.
#[derive(Debug)]
pub enum PageOutcome {
    Extracted(CitationRecord),
    /// The source did not recognize the query term; carries its notice text.
    NotFound(String),
    Failed(StageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub identifier: Identifier,
    pub stage: Stage,
    pub kind: FailureKind,
    pub message: String,
}

/// A record that assembled but left optional fields empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialRecord {
    pub identifier: Identifier,
    pub id: String,
    pub missing: Vec<Field>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub extracted: usize,
    pub failed: usize,
    pub not_found: usize,
    pub partial: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub records: Vec<CitationRecord>,
    pub failures: Vec<FailureEntry>,
    pub not_found: Vec<Identifier>,
    pub partial: Vec<PartialRecord>,
    /// Input keys that carried no usable identifier.
    pub skipped: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchOutcome {
    fn new(skipped: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            not_found: Vec::new(),
            partial: Vec::new(),
            skipped,
            started_at: now,
            finished_at: now,
        }
    }

    fn add_record(&mut self, identifier: &Identifier, record: CitationRecord) {
        let missing = missing_optional_fields(&record);
        if !missing.is_empty() {
            debug!(id = %record.id, ?missing, "record is missing optional fields");
            self.partial.push(PartialRecord {
                identifier: identifier.clone(),
                id: record.id.clone(),
                missing,
            });
        }
        self.records.push(record);
    }

    fn add_failure(&mut self, identifier: &Identifier, failure: StageError) {
        warn!(identifier = %identifier, stage = %failure.stage, "{}", failure.error);
        self.failures.push(FailureEntry {
            identifier: identifier.clone(),
            stage: failure.stage,
            kind: failure.error.kind(),
            message: failure.error.to_string(),
        });
    }

    fn add_page(&mut self, identifier: &Identifier, page: PageOutcome) {
        match page {
            PageOutcome::Extracted(record) => self.add_record(identifier, record),
            PageOutcome::NotFound(notice) => {
                info!(identifier = %identifier, "not found: {notice}");
                self.not_found.push(identifier.clone());
            }
            PageOutcome::Failed(failure) => self.add_failure(identifier, failure),
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.records.len() + self.failures.len() + self.not_found.len(),
            extracted: self.records.len(),
            failed: self.failures.len(),
            not_found: self.not_found.len(),
            partial: self.partial.len(),
            skipped: self.skipped.len(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Optional fields a record came out without.
fn missing_optional_fields(record: &CitationRecord) -> Vec<Field> {
    let mut missing = Vec::new();
    if record.doi.as_deref().is_none_or(str::is_empty) {
        missing.push(Field::Doi);
    }
    if record.pmid.as_deref().is_none_or(str::is_empty) {
        missing.push(Field::Pmid);
    }
    if record.volume.is_empty() {
        missing.push(Field::Volume);
    }
    if record.pages.is_empty() {
        missing.push(Field::Pages);
    }
    missing
}

/// Drives a [`CitationSource`] over a batch of identifiers, one identifier at a time.
///
/// Pacing between requests belongs to the fetcher.
pub struct BatchRunner {
    source: Arc<dyn CitationSource>,
    fetcher: Arc<dyn PageFetcher>,
}

impl BatchRunner {
    pub fn new(source: Arc<dyn CitationSource>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { source, fetcher }
    }

    /// DOIs first, then PMIDs, each group in input order.
    pub async fn run(&self, batch: &IdentifierBatch) -> BatchOutcome {
        let mut outcome = BatchOutcome::new(batch.skipped.clone());
        for key in &batch.skipped {
            warn!(key = %key, "entry has neither doi nor pmid, skipping");
        }

        let total = batch.len();
        for (i, id) in batch.ordered().enumerate() {
            info!("{}/{} Extracting metadata for: {}", i + 1, total, id);
            let page = self.process(id).await;
            outcome.add_page(id, page);
        }

        outcome.finished_at = Utc::now();
        let summary = outcome.summary();
        info!(
            extracted = summary.extracted,
            failed = summary.failed,
            not_found = summary.not_found,
            partial = summary.partial,
            source = self.source.name(),
            "batch finished"
        );
        outcome
    }

    pub async fn process(&self, id: &Identifier) -> PageOutcome {
        let url = self.source.query_url(id);
        debug!(url = %url, "fetching");
        match self.fetcher.fetch(&url).await {
            Ok(markup) => self.extract_page(id, &markup),
            Err(error) => PageOutcome::Failed(StageError {
                stage: Stage::Fetch,
                error,
            }),
        }
    }

    pub fn extract_page(&self, id: &Identifier, markup: &str) -> PageOutcome {
        extract_page(self.source.as_ref(), id, markup)
    }
}

/// Parse `markup` and run extraction on it. The parsed page is dropped on return.
pub fn extract_page(source: &dyn CitationSource, id: &Identifier, markup: &str) -> PageOutcome {
    let document = HtmlDocument::parse(markup);
    extract_document(source, id, &document)
}

pub fn extract_document(
    source: &dyn CitationSource,
    id: &Identifier,
    document: &dyn Document,
) -> PageOutcome {
    if let Availability::NotFound(notice) = source.check_availability(document) {
        return PageOutcome::NotFound(notice);
    }
    match extract_record(source, id, document) {
        Ok(record) => PageOutcome::Extracted(record),
        Err(failure) => PageOutcome::Failed(failure),
    }
}

fn extract_record(
    source: &dyn CitationSource,
    id: &Identifier,
    document: &dyn Document,
) -> Result<CitationRecord, StageError> {
    let primary = at(Stage::ExtractPrimary, source.extract_primary(document, id))?;
    let secondary = at(Stage::ExtractSecondary, source.extract_secondary(document))?;
    let authors = at(Stage::ExtractAuthors, source.extract_authors(document))?;
    at(Stage::Assemble, source.assemble(authors, primary, secondary))
}
