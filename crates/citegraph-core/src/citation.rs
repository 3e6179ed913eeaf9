//! Citation records and their normalization.
//!
//! Every record that enters the pipeline, whether it came from the heuristic
//! parser or from a metadata source, is a [`Citation`]. Normalization happens
//! once through [`Citation::standardize`]; downstream code relies on the
//! cleaned shape instead of re-checking fields.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::matching::normalize_whitespace;

/// Earliest publication year accepted as plausible.
pub const MIN_YEAR: i32 = 1900;
/// Latest publication year accepted as plausible.
pub const MAX_YEAR: i32 = 2030;

/// Whether `year` falls in the accepted publication range.
pub fn is_plausible_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// A single author name.
///
/// Deserializes from either a plain string (`"Ada Lovelace"`) or an object
/// carrying a `name` field (`{"name": "Ada Lovelace", "authorId": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "AuthorRepr")]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Surname heuristic: the part before a comma (`"Smith, J."`), otherwise
    /// the last whitespace-separated token (`"John Smith"`).
    pub fn last_name(&self) -> &str {
        let name = self.name.trim();
        let surname = match name.split_once(',') {
            Some((before, _)) => before.trim(),
            None => name.split_whitespace().last().unwrap_or(""),
        };
        surname.trim_end_matches('.')
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorRepr {
    Name(String),
    Object { name: String },
}

impl From<AuthorRepr> for Author {
    fn from(repr: AuthorRepr) -> Self {
        match repr {
            AuthorRepr::Name(name) | AuthorRepr::Object { name } => Author { name },
        }
    }
}

/// A cited work, as parsed from a reference string or returned by a
/// metadata source.
///
/// Field names on the wire follow the Semantic Scholar conventions
/// (`citationCount`, `referenceCount`, `abstract`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_year"
    )]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(rename = "citationCount", default, skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    #[serde(rename = "referenceCount", default, skip_serializing_if = "Option::is_none")]
    pub reference_count: Option<u64>,
    /// The reference string this record was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    /// Identifier (usually a file name) of the paper that cites this work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_paper: Option<String>,
    /// Sentence in the citing paper where the reference appears, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Citation {
    /// A citation that only carries its raw reference text.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw_text: Some(raw.into()),
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn has_title(&self) -> bool {
        !self.title().trim().is_empty()
    }

    /// A record is usable when it has a title, authors, or raw text.
    pub fn is_valid(&self) -> bool {
        self.has_title()
            || !self.authors.is_empty()
            || self.raw_text.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Number of populated fields. Collections count only when non-empty.
    pub fn non_empty_field_count(&self) -> usize {
        let strings = [
            &self.title,
            &self.venue,
            &self.doi,
            &self.url,
            &self.abstract_text,
            &self.raw_text,
            &self.source_paper,
            &self.context,
        ]
        .into_iter()
        .filter(|s| s.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .count();

        strings
            + usize::from(!self.authors.is_empty())
            + usize::from(self.year.is_some())
            + usize::from(self.citation_count.is_some())
            + usize::from(self.reference_count.is_some())
            + usize::from(self.page_number.is_some())
    }

    /// Normalize every field in place.
    ///
    /// Titles lose wrapping quotes and trailing punctuation, implausible years
    /// are dropped, author lists are trimmed and de-duplicated, venues lose a
    /// leading "In". Empty strings become `None`.
    pub fn standardize(&mut self) {
        self.title = self.title.take().and_then(|t| non_empty(clean_title(&t)));
        self.year = self.year.filter(|y| is_plausible_year(*y));
        self.authors = clean_authors(std::mem::take(&mut self.authors));
        self.venue = self.venue.take().and_then(|v| non_empty(clean_venue(&v)));

        for field in [
            &mut self.doi,
            &mut self.url,
            &mut self.abstract_text,
            &mut self.raw_text,
            &mut self.source_paper,
            &mut self.context,
        ] {
            *field = field.take().and_then(|s| non_empty(normalize_whitespace(&s)));
        }
    }

    /// Consuming variant of [`standardize`](Self::standardize).
    pub fn standardized(mut self) -> Self {
        self.standardize();
        self
    }
}

/// Descriptor of a source ("main") paper whose references were extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainPaper {
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_year"
    )]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

impl MainPaper {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn clean_title(title: &str) -> String {
    let title = normalize_whitespace(title);
    let title = title
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}' | '\u{2018}' | '\u{2019}'))
        .trim_end_matches(['.', ',', ';', ':'])
        .trim();
    title.to_string()
}

fn clean_venue(venue: &str) -> String {
    let venue = normalize_whitespace(venue);
    let venue = venue
        .strip_prefix("In ")
        .or_else(|| venue.strip_prefix("in "))
        .unwrap_or(&venue);
    venue.trim_end_matches(['.', ',', ';']).trim().to_string()
}

fn clean_authors(authors: Vec<Author>) -> Vec<Author> {
    let mut seen = HashSet::new();
    authors
        .into_iter()
        .map(|a| normalize_whitespace(&a.name))
        .map(|name| name.trim_matches([',', ';']).trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(Author::new)
        .collect()
}

/// Accepts a year as an integer, a numeric string, or a placeholder such as
/// `"N/A"` (which becomes `None`).
fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum YearRepr {
        Int(i64),
        Text(String),
    }

    Ok(
        Option::<YearRepr>::deserialize(deserializer)?.and_then(|repr| match repr {
            YearRepr::Int(y) => i32::try_from(y).ok(),
            YearRepr::Text(s) => s.trim().get(..4).and_then(|y| y.parse().ok()),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_from_string_or_object() {
        let authors: Vec<Author> =
            serde_json::from_str(r#"["Ada Lovelace", {"name": "Alan Turing", "authorId": "1"}]"#)
                .unwrap();
        assert_eq!(authors, vec![Author::new("Ada Lovelace"), Author::new("Alan Turing")]);
    }

    #[test]
    fn last_name_variants() {
        assert_eq!(Author::new("Smith, J.").last_name(), "Smith");
        assert_eq!(Author::new("John Smith").last_name(), "Smith");
        assert_eq!(Author::new("  ").last_name(), "");
    }

    #[test]
    fn year_accepts_strings_and_placeholders() {
        let c: Citation = serde_json::from_str(r#"{"title": "X", "year": "2025"}"#).unwrap();
        assert_eq!(c.year, Some(2025));
        let c: Citation = serde_json::from_str(r#"{"title": "X", "year": "N/A"}"#).unwrap();
        assert_eq!(c.year, None);
        let c: Citation = serde_json::from_str(r#"{"title": "X", "year": null}"#).unwrap();
        assert_eq!(c.year, None);
    }

    #[test]
    fn wire_names_follow_semantic_scholar() {
        let c: Citation = serde_json::from_str(
            r#"{"title": "T", "citationCount": 12, "referenceCount": 3, "abstract": "A"}"#,
        )
        .unwrap();
        assert_eq!(c.citation_count, Some(12));
        assert_eq!(c.reference_count, Some(3));
        assert_eq!(c.abstract_text.as_deref(), Some("A"));

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["citationCount"], 12);
        assert!(json.get("venue").is_none());
    }

    #[test]
    fn validity_requires_title_authors_or_raw() {
        assert!(!Citation::default().is_valid());
        assert!(Citation::from_raw("Some reference").is_valid());
        assert!(
            Citation {
                authors: vec![Author::new("A")],
                ..Default::default()
            }
            .is_valid()
        );
        assert!(
            !Citation {
                title: Some("   ".into()),
                ..Default::default()
            }
            .is_valid()
        );
    }

    #[test]
    fn field_count_ignores_empty_collections() {
        let c = Citation {
            title: Some("T".into()),
            authors: vec![],
            year: Some(2020),
            venue: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(c.non_empty_field_count(), 2);
    }

    #[test]
    fn standardize_cleans_fields() {
        let c = Citation {
            title: Some("  \"Attention   Is All You Need.\" ".into()),
            authors: vec![
                Author::new(" Ashish  Vaswani "),
                Author::new("ashish vaswani"),
                Author::new(""),
            ],
            year: Some(1776),
            venue: Some("In Advances in Neural Information Processing Systems.".into()),
            doi: Some("  ".into()),
            ..Default::default()
        }
        .standardized();

        assert_eq!(c.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(c.authors, vec![Author::new("Ashish Vaswani")]);
        assert_eq!(c.year, None);
        assert_eq!(
            c.venue.as_deref(),
            Some("Advances in Neural Information Processing Systems")
        );
        assert_eq!(c.doi, None);
    }

    #[test]
    fn main_paper_from_json() {
        let p: MainPaper = serde_json::from_str(r#"{"title": "Main Paper", "year": "2025"}"#).unwrap();
        assert_eq!(p.title, "Main Paper");
        assert_eq!(p.year, Some(2025));
    }
}
