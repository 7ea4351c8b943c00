use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("{field} not found on page (selector `{selector}` matched nothing)")]
    MissingField { field: String, selector: String },

    #[error("failed to parse authors: {0}")]
    AuthorParse(String),

    #[error("citation string not found on page (selector `{selector}` matched nothing)")]
    SecondaryMetadata { selector: String },

    #[error("cannot assemble record: {0}")]
    Assembly(String),

    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category recorded in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingField,
    AuthorParse,
    SecondaryMetadata,
    Assembly,
    Fetch,
    Other,
}

impl ScienceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingField { .. } => FailureKind::MissingField,
            Self::AuthorParse(_) => FailureKind::AuthorParse,
            Self::SecondaryMetadata { .. } => FailureKind::SecondaryMetadata,
            Self::Assembly(_) => FailureKind::Assembly,
            Self::Http(_) | Self::ApiError(..) | Self::RateLimit(..) => FailureKind::Fetch,
            Self::InvalidDoi(_) | Self::Parse(_) | Self::Io(_) | Self::Json(_) => {
                FailureKind::Other
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let missing = ScienceError::MissingField {
            field: "title".into(),
            selector: "h1.heading-title".into(),
        };
        assert_eq!(missing.kind(), FailureKind::MissingField);
        assert!(missing.to_string().contains("h1.heading-title"));

        assert_eq!(
            ScienceError::ApiError("u".into(), "HTTP 500".into()).kind(),
            FailureKind::Fetch
        );
        assert_eq!(
            ScienceError::RateLimit("u".into(), 7).kind(),
            FailureKind::Fetch
        );
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::SecondaryMetadata).unwrap();
        assert_eq!(json, "\"secondary_metadata\"");
    }
}
