//! Loading the identifier mapping handed to a batch run.
//!
//! The input is a JSON object whose keys are arbitrary labels and whose values carry a `doi`
//! and/or a `pmid`. Each entry contributes exactly one identifier: the DOI when it is present
//! and non-blank, otherwise the PMID.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PubciteError, Result};
use crate::models::Identifier;

#[derive(Debug, Clone, Default, Deserialize)]
struct InputEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    doi: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pmid: Option<String>,
}

/// Identifiers grouped by kind, each group in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdentifierBatch {
    pub dois: Vec<Identifier>,
    pub pmids: Vec<Identifier>,
    /// Input keys that carried neither identifier.
    pub skipped: Vec<String>,
}

impl IdentifierBatch {
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(PubciteError::InvalidInput(
                "expected a JSON object mapping keys to {doi, pmid} entries".to_string(),
            ));
        }
        let entries: IndexMap<String, InputEntry> = serde_json::from_value(value)?;

        let mut batch = Self::default();
        for (key, entry) in entries {
            if let Some(doi) = entry.doi.as_deref().and_then(|v| Identifier::doi(v).ok()) {
                batch.dois.push(doi);
            } else if let Some(pmid) = entry.pmid.as_deref().and_then(|v| Identifier::pmid(v).ok())
            {
                batch.pmids.push(pmid);
            } else {
                batch.skipped.push(key);
            }
        }
        Ok(batch)
    }

    /// Build a batch directly from identifiers, regrouping them by kind.
    pub fn from_identifiers<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut batch = Self::default();
        for id in ids {
            match id {
                Identifier::Doi(_) => batch.dois.push(id),
                Identifier::Pmid(_) => batch.pmids.push(id),
            }
        }
        batch
    }

    /// DOIs first, then PMIDs.
    pub fn ordered(&self) -> impl Iterator<Item = &Identifier> {
        self.dois.iter().chain(self.pmids.iter())
    }

    pub fn len(&self) -> usize {
        self.dois.len() + self.pmids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accepts a string, a number, or null. Numbers show up for PMIDs exported by spreadsheets.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
