use once_cell::sync::Lazy;
use pubcite_core::Author;
use regex::Regex;

use crate::error::{Result, ScienceError};
use crate::extract::RawField;
use crate::normalize::NormalizedField;

/// PubMed short form initials: `J`, `AB`, `J.A.`, `JAB.`
///
/// A bare three-letter capital run (`LEE`) reads as an upper-cased family name.
static INITIALS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\p{Lu}{1,2}\.?|(?:\p{Lu}\.){1,3}|\p{Lu}{3}\.)$").expect("valid regex")
});
static MIDDLE_INITIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}\.?$").expect("valid regex"));

pub fn normalize_authors(raw: &RawField) -> Result<NormalizedField> {
    if raw.is_empty() {
        return Err(ScienceError::AuthorParse(format!(
            "author listing is empty (selector `{}`)",
            raw.selector
        )));
    }

    let authors = strip_duplicate_listing(raw.fragments())
        .into_iter()
        .filter_map(parse_author_name)
        .collect::<Vec<_>>();
    if authors.is_empty() {
        return Err(ScienceError::AuthorParse(format!(
            "no parseable names in {} listed entries",
            raw.fragments().len()
        )));
    }
    Ok(NormalizedField::Authors(authors))
}

/// Article pages render the author list twice. Depending on layout the copies are
/// back to back (`A B A B`) or interleaved (`A A B B`). When neither pattern holds
/// exactly the first half (rounded up) is kept.
pub fn strip_duplicate_listing(names: &[String]) -> Vec<&str> {
    let n = names.len();
    if n >= 2 && n % 2 == 0 {
        let (front, back) = names.split_at(n / 2);
        if front == back {
            return front.iter().map(String::as_str).collect();
        }
        if names.chunks(2).all(|pair| pair[0] == pair[1]) {
            return names.iter().step_by(2).map(String::as_str).collect();
        }
    }

    names[..n.div_ceil(2)].iter().map(String::as_str).collect()
}

/// Parse one display name into family and given parts.
///
/// `"Doe A B"` / `"Smith JA"` (family first, trailing initials) and
/// `"John A Smith"` (given first, family last) are both accepted.
pub fn parse_author_name(name: &str) -> Option<Author> {
    let tokens = name.split_whitespace().collect::<Vec<_>>();
    let (first, rest) = tokens.split_first()?;
    if rest.is_empty() {
        return Some(Author::new(*first, ""));
    }

    let initials_from = tokens
        .iter()
        .rposition(|t| !INITIALS_RE.is_match(t))
        .map_or(0, |idx| idx + 1);
    if initials_from > 0 && initials_from < tokens.len() {
        let family = tokens[..initials_from].join(" ");
        let given = tokens[initials_from..]
            .iter()
            .flat_map(|t| t.chars())
            .filter(|c| *c != '.')
            .collect::<String>();
        return Some(Author::new(family, given));
    }

    let family = tokens
        .iter()
        .rev()
        .find(|t| *t != first)
        .copied()
        .unwrap_or(*first);
    let mut given = (*first).to_string();
    for initial in rest[..rest.len() - 1]
        .iter()
        .filter(|t| MIDDLE_INITIAL_RE.is_match(t))
    {
        given.push(' ');
        given.push_str(initial);
    }
    Some(Author::new(family, given))
}
