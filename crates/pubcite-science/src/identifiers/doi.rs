use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

const RESOLVER_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];

/// A validated DOI, lower-cased for comparison and output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
}

impl Doi {
    /// Accepts a bare DOI, a resolver URL, or a `doi:` labelled value.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let body = RESOLVER_PREFIXES
            .iter()
            .find_map(|prefix| raw.strip_prefix(prefix))
            .or_else(|| strip_label(raw))
            .unwrap_or(raw);

        let (registrant, suffix) = body
            .split_once('/')
            .ok_or_else(|| ScienceError::InvalidDoi(raw.to_string()))?;
        if !registrant.starts_with("10.") || suffix.is_empty() {
            return Err(ScienceError::InvalidDoi(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            normalized: body.to_lowercase(),
        })
    }

    /// Parse the DOI label printed on article pages, e.g. `"doi: 10.1038/s41593-018-0001-x."`.
    ///
    /// The sentence-ending period is not part of the DOI.
    pub fn from_page_label(label: &str) -> Result<Self> {
        Self::parse(label.trim().trim_end_matches('.'))
    }

    pub fn url(&self) -> String {
        format!("https://doi.org/{}", self.normalized)
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Strips a case-insensitive `doi:` label and any whitespace after it.
fn strip_label(input: &str) -> Option<&str> {
    let head = input.get(..4)?;
    if head.eq_ignore_ascii_case("doi:") {
        Some(input[4..].trim_start())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_doi_is_kept() {
        let doi = Doi::parse("10.1111/jsr.13000").unwrap();
        assert_eq!(doi.normalized, "10.1111/jsr.13000");
        assert_eq!(doi.url(), "https://doi.org/10.1111/jsr.13000");
    }

    #[test]
    fn resolver_urls_are_stripped() {
        for input in [
            "https://doi.org/10.1111/jsr.13000",
            "http://dx.doi.org/10.1111/jsr.13000",
        ] {
            assert_eq!(Doi::parse(input).unwrap().normalized, "10.1111/jsr.13000");
        }
    }

    #[test]
    fn label_is_stripped_case_insensitively() {
        assert_eq!(Doi::parse("doi:10.1111/jsr.13000").unwrap().to_string(), "10.1111/jsr.13000");
        assert_eq!(Doi::parse("DOI: 10.1111/jsr.13000").unwrap().to_string(), "10.1111/jsr.13000");
    }

    #[test]
    fn page_label_is_lower_cased_without_trailing_period() {
        let doi = Doi::from_page_label(" doi: 10.1038/S41593-018-0001-X. ").unwrap();
        assert_eq!(doi.normalized, "10.1038/s41593-018-0001-x");
        assert_eq!(doi.raw, "doi: 10.1038/S41593-018-0001-X");
    }

    #[test]
    fn malformed_values_are_rejected() {
        for input in ["", "pmid 30559365", "10.1038", "10.1038/", "11.1038/abc"] {
            assert!(
                matches!(Doi::parse(input), Err(ScienceError::InvalidDoi(_))),
                "{input:?} should be rejected"
            );
        }
    }
}
