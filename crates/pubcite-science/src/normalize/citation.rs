//! Rules for the composite citation string, e.g. `"2019 Jan;12(3):145-52."`.

use once_cell::sync::Lazy;
use pubcite_core::{Issued, Pages};
use regex::Regex;

use crate::error::{Result, ScienceError};
use crate::extract::RawField;
use crate::normalize::NormalizedField;

/// Volume precedes the issue parenthesis, or sits between `;` and `:` when there is no issue.
static VOLUME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+?)\(|;(\d+?):").expect("valid regex"));
static PAGE_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":(\d*)").expect("valid regex"));
static PAGE_STOP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d*)\.").expect("valid regex"));
static ARTICLE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":(e\d+)").expect("valid regex"));

fn composite(raw: &RawField) -> Result<&str> {
    raw.first().ok_or_else(|| ScienceError::SecondaryMetadata {
        selector: raw.selector.clone(),
    })
}

pub fn normalize_year(raw: &RawField) -> Result<NormalizedField> {
    let citation = composite(raw)?;
    let year = citation.split_whitespace().next().unwrap_or_default();
    Ok(NormalizedField::Year(Issued::from_year(year)))
}

pub fn normalize_volume(raw: &RawField) -> Result<NormalizedField> {
    composite(raw).map(|citation| NormalizedField::Volume(parse_volume(citation)))
}

pub fn normalize_pages(raw: &RawField) -> Result<NormalizedField> {
    composite(raw).map(|citation| NormalizedField::Pages(parse_pages(citation)))
}

/// Empty when the string carries no recognizable volume.
pub fn parse_volume(citation: &str) -> String {
    VOLUME_RE
        .captures(citation)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn parse_pages(citation: &str) -> Pages {
    let start = PAGE_START_RE
        .captures(citation)
        .and_then(|caps| caps[1].parse::<u64>().ok());
    let stop = PAGE_STOP_RE
        .captures(citation)
        .and_then(|caps| caps[1].parse::<u64>().ok());

    match (start, stop) {
        (Some(start), Some(stop)) => {
            let (start, stop) = expand_truncated_stop(start, stop);
            Pages::Range { start, stop }
        }
        _ => ARTICLE_NUMBER_RE
            .captures(citation)
            .map(|caps| Pages::Token(caps[1].to_string()))
            .unwrap_or_default(),
    }
}

/// `145-52` means `145-152`: a stop smaller than start repeats the leading digits of start.
pub fn expand_truncated_stop(start: u64, stop: u64) -> (String, String) {
    let start_digits = start.to_string();
    let stop_digits = stop.to_string();
    if stop >= start || stop_digits.len() >= start_digits.len() {
        return (start_digits, stop_digits);
    }
    let prefix = &start_digits[..start_digits.len() - stop_digits.len()];
    let expanded = format!("{prefix}{stop_digits}");
    (start_digits, expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Field;

    fn cit(text: &str) -> RawField {
        RawField::new(Field::Citation, "span.cit", vec![text.to_string()])
    }

    #[test]
    fn truncated_stop_is_reconstructed() {
        assert_eq!(parse_pages("2019 Jan;12(3):145-52."), Pages::range("145", "152"));
        assert_eq!(parse_pages("2020 Mar;7(1):1021-9."), Pages::range("1021", "1029"));
    }

    #[test]
    fn full_range_is_kept() {
        assert_eq!(parse_pages("2018;33:100-120."), Pages::range("100", "120"));
    }

    #[test]
    fn article_number_fallback() {
        assert_eq!(parse_pages(":e12345."), Pages::Token("e12345".into()));
        assert_eq!(
            parse_pages("2021 May 3;45(2):e100045"),
            Pages::Token("e100045".into())
        );
    }

    #[test]
    fn missing_pages_are_empty_not_an_error() {
        assert_eq!(parse_pages("2019 Jan 5"), Pages::Empty);
        let field = normalize_pages(&cit("2019 Jan 5")).unwrap();
        assert_eq!(field, NormalizedField::Pages(Pages::Empty));
    }

    #[test]
    fn stop_longer_than_start_is_left_alone() {
        assert_eq!(expand_truncated_stop(999, 100), ("999".into(), "100".into()));
        assert_eq!(expand_truncated_stop(45, 2), ("45".into(), "42".into()));
    }

    #[test]
    fn volume_before_issue_or_between_separators() {
        assert_eq!(parse_volume("2019 Jan;12(3):145-52."), "12");
        assert_eq!(parse_volume("2018;33:100-120."), "33");
        assert_eq!(parse_volume("2021 May 3;45(2):e100045"), "45");
        assert_eq!(parse_volume("2019 Jan 5"), "");
    }

    #[test]
    fn volume_survives_renormalization() {
        for citation in ["2019 Jan;12(3):145-52.", "2018;33:100-120.", "2001;7(2):1-9."] {
            let volume = parse_volume(citation);
            let synthetic = format!("2000;{volume}:1.");
            assert_eq!(parse_volume(&synthetic), volume);
        }
    }

    #[test]
    fn year_is_first_token_wrapped_twice() {
        let field = normalize_year(&cit("2021 May 3;45(2):e100045")).unwrap();
        assert_eq!(field, NormalizedField::Year(Issued::from_year("2021")));
    }

    #[test]
    fn absent_citation_is_secondary_metadata_error() {
        let empty = RawField::new(Field::Citation, "span.cit", Vec::new());
        for rule in [normalize_year, normalize_volume, normalize_pages] {
            let err = rule(&empty).unwrap_err();
            assert!(matches!(err, ScienceError::SecondaryMetadata { ref selector } if selector == "span.cit"));
        }
    }
}
