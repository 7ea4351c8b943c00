use serde::{Deserialize, Serialize};

/// CSL type tag written for every extracted record.
pub const ARTICLE_TYPE: &str = "article";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub family: String,
    pub given: String,
}

impl Author {
    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        Self {
            family: family.into().trim().to_string(),
            given: given.into().trim().to_string(),
        }
    }
}

/// CSL `issued` block. The year is kept in its raw `[[year]]` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issued {
    pub raw: Vec<Vec<String>>,
}

impl Issued {
    pub fn from_year(year: impl Into<String>) -> Self {
        Self {
            raw: vec![vec![year.into()]],
        }
    }

    /// First token of the raw wrapper, if any.
    pub fn year(&self) -> Option<&str> {
        self.raw
            .first()
            .and_then(|inner| inner.first())
            .map(String::as_str)
    }
}

/// Page information for an article.
///
/// Serialized as `"start-stop"`, as the bare token, or as an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pages {
    Range { start: String, stop: String },
    /// Article number such as `e12345`.
    Token(String),
    #[default]
    Empty,
}

impl Pages {
    pub fn range(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self::Range {
            start: start.into(),
            stop: stop.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn render(&self) -> String {
        match self {
            Self::Range { start, stop } => format!("{start}-{stop}"),
            Self::Token(token) => token.clone(),
            Self::Empty => String::new(),
        }
    }
}

impl From<Pages> for String {
    fn from(pages: Pages) -> Self {
        pages.render()
    }
}

impl From<String> for Pages {
    fn from(value: String) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return Self::Empty;
        }
        match value.split_once('-') {
            Some((start, stop)) if !start.is_empty() && !stop.is_empty() => {
                Self::range(start, stop)
            }
            _ => Self::Token(value.to_string()),
        }
    }
}

/// One assembled CSL-JSON article entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub title: String,

    #[serde(rename = "type")]
    pub item_type: String,

    #[serde(rename = "author")]
    pub authors: Vec<Author>,

    pub issued: Issued,

    pub journal: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    #[serde(default)]
    pub volume: String,

    #[serde(default, skip_serializing_if = "Pages::is_empty")]
    pub pages: Pages,

    pub id: String,
}

impl CitationRecord {
    /// Record id: lower-cased family name followed by the year token.
    pub fn derive_id(family: &str, year: &str) -> String {
        format!("{}{}", family.trim().to_lowercase(), year.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CitationRecord {
        CitationRecord {
            title: "A study of things".to_string(),
            item_type: ARTICLE_TYPE.to_string(),
            authors: vec![Author::new("Smith", "J")],
            issued: Issued::from_year("2019"),
            journal: "J Things".to_string(),
            doi: Some("10.1000/xyz".to_string()),
            pmid: Some("123".to_string()),
            volume: "12".to_string(),
            pages: Pages::range("145", "152"),
            id: CitationRecord::derive_id("Smith", "2019"),
        }
    }

    #[test]
    fn serializes_csl_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "article");
        assert_eq!(json["author"][0]["family"], "Smith");
        assert_eq!(json["issued"]["raw"], serde_json::json!([["2019"]]));
        assert_eq!(json["pages"], "145-152");
        assert_eq!(json["id"], "smith2019");
    }

    #[test]
    fn empty_pages_and_missing_doi_are_omitted() {
        let mut record = sample();
        record.pages = Pages::Empty;
        record.doi = None;
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("pages").is_none());
        assert!(json.get("doi").is_none());
        assert_eq!(json["volume"], "12");
    }

    #[test]
    fn pages_read_back_from_rendered_form() {
        assert_eq!(Pages::from("145-152".to_string()), Pages::range("145", "152"));
        assert_eq!(Pages::from("e100045".to_string()), Pages::Token("e100045".into()));
        assert_eq!(Pages::from(" ".to_string()), Pages::Empty);
    }

    #[test]
    fn issued_exposes_year_token() {
        let issued = Issued::from_year("2021");
        assert_eq!(issued.year(), Some("2021"));
        assert_eq!(Issued { raw: vec![] }.year(), None);
    }

    #[test]
    fn author_fields_are_trimmed() {
        let author = Author::new(" Doe ", " AB");
        assert_eq!(author.family, "Doe");
        assert_eq!(author.given, "AB");
    }
}
