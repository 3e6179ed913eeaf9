//! Presentation attributes derived from citation metadata.
//!
//! Everything here is a pure function of a [`Citation`] and the
//! [`GraphConfig`]; nothing reads the clock, so a fixed `reference_year`
//! gives reproducible graphs.

use std::fmt;

use serde::Serialize;

use citegraph_core::Citation;

use crate::config::GraphConfig;

/// Color of source-paper nodes.
pub const MAIN_NODE_COLOR: &str = "#1f77b4";
/// Size of source-paper nodes.
pub const MAIN_NODE_SIZE: f64 = 25.0;
/// Labels longer than this many characters are truncated.
pub const LABEL_MAX_CHARS: usize = 60;

/// Citations counted above this are high impact regardless of venue.
const HIGH_IMPACT_CITATIONS: u64 = 100;

/// Venue keywords marking a high-impact publication. Matched as whole words,
/// case-insensitively.
pub const DEFAULT_HIGH_IMPACT_VENUES: &[&str] = &[
    "Nature",
    "Science",
    "Cell",
    "Lancet",
    "NeurIPS",
    "NIPS",
    "ICML",
    "ICLR",
    "CVPR",
    "ICCV",
    "ACL",
    "EMNLP",
    "KDD",
    "SIGMOD",
    "SIGGRAPH",
    "OSDI",
    "SOSP",
    "PNAS",
];

/// Display category of a citation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    HighImpact,
    Recent,
    Moderate,
    Older,
    Classic,
    Unknown,
}

impl Category {
    pub fn color(self) -> &'static str {
        match self {
            Category::HighImpact => "#d62728",
            Category::Recent => "#ff7f0e",
            Category::Moderate => "#2ca02c",
            Category::Older => "#1f77b4",
            Category::Classic => "#9467bd",
            Category::Unknown => "#7f7f7f",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::HighImpact => "high_impact",
            Category::Recent => "recent",
            Category::Moderate => "moderate",
            Category::Older => "older",
            Category::Classic => "classic",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `venue` contains one of the configured high-impact keywords as a
/// whole word (or run of words).
pub fn is_high_impact_venue(venue: &str, keywords: &[String]) -> bool {
    let words = words_of(venue);
    keywords.iter().any(|kw| {
        let needle = words_of(kw);
        !needle.is_empty() && words.windows(needle.len()).any(|w| w == needle.as_slice())
    })
}

fn words_of(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn has_high_impact_venue(citation: &Citation, config: &GraphConfig) -> bool {
    citation
        .venue
        .as_deref()
        .is_some_and(|v| is_high_impact_venue(v, &config.high_impact_venues))
}

/// Category by venue and citation count first, then by publication year.
pub fn categorize(citation: &Citation, config: &GraphConfig) -> Category {
    if has_high_impact_venue(citation, config)
        || citation.citation_count.is_some_and(|c| c > HIGH_IMPACT_CITATIONS)
    {
        return Category::HighImpact;
    }
    match citation.year {
        Some(y) if y >= 2020 => Category::Recent,
        Some(y) if y >= 2015 => Category::Moderate,
        Some(y) if y >= 2010 => Category::Older,
        Some(_) => Category::Classic,
        None => Category::Unknown,
    }
}

/// Popularity/recency/venue composite in `0.0..=10.0`.
///
/// * up to 5 points for citations (one per 20)
/// * 2 points if published within 5 years of the reference year, 1 within 10
/// * 2 points for a high-impact venue
/// * 1 point for more than 5 authors
pub fn influence_score(citation: &Citation, config: &GraphConfig) -> f64 {
    let mut score = citation
        .citation_count
        .map(|c| (c as f64 / 20.0).min(5.0))
        .unwrap_or(0.0);

    if let Some(year) = citation.year {
        let age = config.reference_year - year;
        if age <= 5 {
            score += 2.0;
        } else if age <= 10 {
            score += 1.0;
        }
    }

    if has_high_impact_venue(citation, config) {
        score += 2.0;
    }
    if citation.authors.len() > 5 {
        score += 1.0;
    }

    score.min(10.0)
}

/// Node size from an influence score, clamped to `8.0..=20.0`.
pub fn node_size(influence: f64) -> f64 {
    (10.0 + influence * 2.0).clamp(8.0, 20.0)
}

/// Title truncated to [`LABEL_MAX_CHARS`] characters with a trailing `...`.
pub fn truncate_label(title: &str) -> String {
    if title.chars().count() > LABEL_MAX_CHARS {
        let head: String = title.chars().take(LABEL_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}
