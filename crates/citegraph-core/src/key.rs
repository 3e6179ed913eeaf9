use std::fmt;

use serde::Serialize;

use crate::citation::Citation;
use crate::matching::normalize_whitespace;

/// Number of title characters that participate in a [`CitationKey`].
pub const KEY_TITLE_CHARS: usize = 50;

/// Equality surrogate for a cited work: truncated lowercase title, year, and
/// the first author's last name, joined with `|`.
///
/// Two citations with the same key are treated as the same work, so a paper
/// cited by several source papers becomes a single graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CitationKey(String);

impl CitationKey {
    pub fn of(citation: &Citation) -> Self {
        let title: String = normalize_whitespace(citation.title())
            .to_lowercase()
            .chars()
            .take(KEY_TITLE_CHARS)
            .collect();
        let year = citation.year.map(|y| y.to_string()).unwrap_or_default();
        let author = citation
            .authors
            .first()
            .map(|a| a.last_name().to_lowercase())
            .unwrap_or_default();
        CitationKey(format!("{title}|{year}|{author}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CitationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Citation> for CitationKey {
    fn from(citation: &Citation) -> Self {
        Self::of(citation)
    }
}
