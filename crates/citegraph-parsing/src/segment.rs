//! Splitting reference-bearing text into individual reference strings.
//!
//! Four strategies are tried in a fixed order; the first one that leaves at
//! least one reference after the post-filter wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ParsingConfig;
use crate::text_processing::{append_line, post_filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentationStrategy {
    /// `[1]`, `(1)`, `1.` markers at line start.
    Numbered,
    /// `Surname, I.` at line start with a year on the same line.
    AuthorYear,
    /// Lines carrying a DOI, URL, `arxiv:` token or a bare year.
    Identifier,
    /// Sentence splitting on periods, keeping reference-like sentences.
    PeriodDelimited,
}

impl SegmentationStrategy {
    /// Strategies in the order they are attempted.
    pub const ORDER: [SegmentationStrategy; 4] = [
        SegmentationStrategy::Numbered,
        SegmentationStrategy::AuthorYear,
        SegmentationStrategy::Identifier,
        SegmentationStrategy::PeriodDelimited,
    ];

    /// Raw, unfiltered candidates produced by this strategy.
    pub fn candidates(self, text: &str, config: &ParsingConfig) -> Vec<String> {
        match self {
            SegmentationStrategy::Numbered => group_lines(text, is_numbered_start),
            SegmentationStrategy::AuthorYear => group_lines(text, is_author_year_start),
            SegmentationStrategy::Identifier => group_lines(text, is_identifier_start),
            SegmentationStrategy::PeriodDelimited => period_delimited(text, config),
        }
    }

    /// Stable lowercase name used in logs and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            SegmentationStrategy::Numbered => "numbered",
            SegmentationStrategy::AuthorYear => "author_year",
            SegmentationStrategy::Identifier => "identifier",
            SegmentationStrategy::PeriodDelimited => "period_delimited",
        }
    }
}

impl std::fmt::Display for SegmentationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of segmentation: the winning strategy (if any) and the cleaned
/// references in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentationResult {
    pub strategy: Option<SegmentationStrategy>,
    pub references: Vec<String>,
}

/// Split `text` into cleaned reference strings.
pub fn segment_references(text: &str, config: &ParsingConfig) -> SegmentationResult {
    for strategy in SegmentationStrategy::ORDER {
        let raw = strategy.candidates(text, config);
        let raw_count = raw.len();
        let references = post_filter(raw, config);
        if !references.is_empty() {
            tracing::debug!(
                strategy = strategy.name(),
                raw = raw_count,
                kept = references.len(),
                "segmented references"
            );
            return SegmentationResult {
                strategy: Some(strategy),
                references,
            };
        }
        tracing::trace!(strategy = strategy.name(), raw = raw_count, "strategy yielded nothing");
    }
    tracing::debug!("no segmentation strategy produced references");
    SegmentationResult::default()
}

/// Group lines into references: a line for which `starts` holds opens a new
/// reference, any other line continues the current one. Lines before the
/// first start and bare page numbers are dropped.
fn group_lines(text: &str, starts: impl Fn(&str) -> bool) -> Vec<String> {
    let mut refs = Vec::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_page_number(trimmed) {
            continue;
        }
        if starts(trimmed) {
            if let Some(done) = current.take() {
                refs.push(done);
            }
            let mut fresh = String::new();
            append_line(&mut fresh, trimmed);
            current = Some(fresh);
        } else if let Some(cur) = current.as_mut() {
            append_line(cur, trimmed);
        }
    }
    refs.extend(current);
    refs
}

fn is_page_number(line: &str) -> bool {
    line.len() <= 4 && line.chars().all(|c| c.is_ascii_digit())
}

fn is_numbered_start(line: &str) -> bool {
    // Up to three digits, so a leading year is never a marker.
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[\[(]?\d{1,3}[\])]?\.?(?:\s|$)").unwrap());
    RE.is_match(line)
}

fn is_author_year_start(line: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\p{Lu}[\p{L}'’\-]+(?:[ \-]\p{Lu}[\p{L}'’\-]+)?,\s*\p{Lu}\..*\b(?:19|20)\d{2}")
            .unwrap()
    });
    RE.is_match(line)
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

fn is_identifier_start(line: &str) -> bool {
    static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\bdoi\b|https?://|\barxiv:|\b10\.\d{4,9}/").unwrap()
    });
    MARKER_RE.is_match(line) || YEAR_RE.is_match(line)
}

/// Words that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "al", "vol", "vols", "no", "pp", "ed", "eds", "proc", "conf", "int", "intl", "jr", "sr", "dr",
    "fig", "vs", "inc", "univ", "dept", "trans", "st", "et", "pt", "ch", "sec", "rev", "natl",
];

fn period_delimited(text: &str, config: &ParsingConfig) -> Vec<String> {
    static AUTHOR_LIKE_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\p{Lu}[\p{L}'’\-]+,\s*\p{Lu}\.|\b\p{Lu}\.\s*\p{Lu}[\p{L}'’\-]+").unwrap()
    });
    static VENUE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)\b(?:doi|arxiv|journal|conference|proceedings)\b").unwrap());

    split_sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() > config.min_fallback_chars)
        .filter(|s| YEAR_RE.is_match(s))
        .filter(|s| AUTHOR_LIKE_RE.is_match(s) || VENUE_RE.is_match(s))
        .collect()
}

/// Split on periods that end a sentence: followed by whitespace and then an
/// uppercase letter, digit or bracket, and not closing an initial or a
/// known abbreviation.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        if c != '.' || !chars.get(i + 1).is_some_and(|n| n.is_whitespace()) {
            continue;
        }
        let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
        if !next.is_some_and(|n| n.is_uppercase() || n.is_ascii_digit() || *n == '[') {
            continue;
        }
        let word: String = chars[..i]
            .iter()
            .rev()
            .take_while(|ch| ch.is_alphabetic())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let word_chars = word.chars().count();
        if word_chars == 1 || ABBREVIATIONS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        sentences.push(std::mem::take(&mut current));
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
        .into_iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}
