use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PubciteError, Result};

/// Which kind of identifier an input entry was keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Doi,
    Pmid,
}

impl IdentifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Pmid => "pmid",
        }
    }
}

/// An article identifier: a DOI or a PubMed accession number.
///
/// Always holds a trimmed, non-empty value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Identifier {
    Doi(String),
    Pmid(String),
}

impl Identifier {
    pub fn doi(raw: &str) -> Result<Self> {
        non_empty(raw, IdentifierKind::Doi).map(Self::Doi)
    }

    pub fn pmid(raw: &str) -> Result<Self> {
        non_empty(raw, IdentifierKind::Pmid).map(Self::Pmid)
    }

    pub fn new(kind: IdentifierKind, raw: &str) -> Result<Self> {
        match kind {
            IdentifierKind::Doi => Self::doi(raw),
            IdentifierKind::Pmid => Self::pmid(raw),
        }
    }

    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::Doi(_) => IdentifierKind::Doi,
            Self::Pmid(_) => IdentifierKind::Pmid,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Doi(v) | Self::Pmid(v) => v,
        }
    }

    pub fn as_doi(&self) -> Option<&str> {
        match self {
            Self::Doi(v) => Some(v),
            Self::Pmid(_) => None,
        }
    }

    pub fn as_pmid(&self) -> Option<&str> {
        match self {
            Self::Pmid(v) => Some(v),
            Self::Doi(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

fn non_empty(raw: &str, kind: IdentifierKind) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PubciteError::InvalidIdentifier(format!(
            "empty {} value",
            kind.as_str()
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_identifier_values() {
        let id = Identifier::doi("  10.1000/xyz123 \n").unwrap();
        assert_eq!(id.value(), "10.1000/xyz123");
        assert_eq!(id.kind(), IdentifierKind::Doi);
        assert_eq!(id.as_doi(), Some("10.1000/xyz123"));
        assert_eq!(id.as_pmid(), None);
    }

    #[test]
    fn rejects_blank_values() {
        assert!(Identifier::pmid("   ").is_err());
        assert!(Identifier::doi("").is_err());
    }

    #[test]
    fn display_prints_bare_value() {
        let id = Identifier::pmid("31234567").unwrap();
        assert_eq!(id.to_string(), "31234567");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let id = Identifier::pmid("31234567").unwrap();
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "pmid", "value": "31234567"}));
    }
}
