//! Heuristic parsing of a single unstructured reference string.
//!
//! Every field is produced by its own ordered list of pure extractors; the
//! first extractor returning `Some` wins. Fields are extracted independently
//! of each other, so a token used as the year may also appear in the title.
//! Parsing never fails: anything not recognized is left absent.

use once_cell::sync::Lazy;
use regex::Regex;

use citegraph_core::citation::{Author, Citation, is_plausible_year};

/// One heuristic for one field.
pub type FieldExtractor<T> = fn(&str) -> Option<T>;

/// Extractors for the publication year, in priority order.
pub const YEAR_EXTRACTORS: &[FieldExtractor<i32>] = &[first_plausible_year];

/// Extractors for the title, in priority order.
pub const TITLE_EXTRACTORS: &[FieldExtractor<String>] = &[
    double_quoted_title,
    single_quoted_title,
    between_periods_title,
    long_segment_title,
];

/// Extractors for the author list, in priority order.
pub const AUTHOR_EXTRACTORS: &[FieldExtractor<Vec<Author>>] = &[comma_separated_authors];

/// Extractors for the venue, in priority order.
pub const VENUE_EXTRACTORS: &[FieldExtractor<String>] = &[keyword_venue];

pub const DOI_EXTRACTORS: &[FieldExtractor<String>] = &[bare_doi];

pub const URL_EXTRACTORS: &[FieldExtractor<String>] = &[http_url];

/// Run extractors in order and return the first hit.
pub fn first_match<T>(extractors: &[FieldExtractor<T>], text: &str) -> Option<T> {
    extractors.iter().find_map(|extract| extract(text))
}

/// Parse a raw reference into a standardized [`Citation`], keeping the raw
/// text.
pub fn parse_citation(raw: &str) -> Citation {
    Citation {
        title: first_match(TITLE_EXTRACTORS, raw),
        authors: first_match(AUTHOR_EXTRACTORS, raw).unwrap_or_default(),
        year: first_match(YEAR_EXTRACTORS, raw),
        venue: first_match(VENUE_EXTRACTORS, raw),
        doi: first_match(DOI_EXTRACTORS, raw),
        url: first_match(URL_EXTRACTORS, raw),
        raw_text: Some(raw.to_string()),
        ..Default::default()
    }
    .standardized()
}

// ── Year ──

/// First `19xx`/`20xx` token not glued to other digits, within the plausible
/// range.
pub fn first_plausible_year(text: &str) -> Option<i32> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").unwrap());
    // Matches can share a separator char, so step through candidates by hand.
    let mut start = 0;
    while let Some(caps) = RE.captures_at(text, start) {
        let m = caps.get(1)?;
        if let Ok(year) = m.as_str().parse::<i32>()
            && is_plausible_year(year)
        {
            return Some(year);
        }
        start = m.end();
    }
    None
}

// ── Title ──

fn tidy(span: &str) -> Option<String> {
    let t = span.trim().trim_end_matches([',', '.', ';', ':']).trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

/// `"Title"` or `“Title”`.
pub fn double_quoted_title(text: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"|“([^”]+)”"#).unwrap());
    let caps = RE.captures(text)?;
    tidy(caps.get(1).or_else(|| caps.get(2))?.as_str())
}

/// `'Title'` or `‘Title’`, opened at a word boundary so apostrophes inside
/// names are not mistaken for quotes.
pub fn single_quoted_title(text: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?:^|[\s(\[])['‘]([^'’]{10,})['’](?:[\s.,;:)\]]|$)").unwrap()
    });
    let caps = RE.captures(text)?;
    tidy(caps.get(1)?.as_str())
}

/// A span bounded by periods on both sides, longer than 10 characters and
/// containing letters. Spans that end in a bare initial are author lists.
pub fn between_periods_title(text: &str) -> Option<String> {
    let segments: Vec<&str> = text.split('.').collect();
    if segments.len() < 3 {
        return None;
    }
    segments[1..segments.len() - 1]
        .iter()
        .map(|s| s.trim())
        .find(|s| {
            s.chars().count() > 10 && s.chars().any(char::is_alphabetic) && !ends_with_initial(s)
        })
        .and_then(tidy)
}

/// Fallback: the first period-delimited segment longer than 20 characters
/// that is not just a year.
pub fn long_segment_title(text: &str) -> Option<String> {
    text.split('.')
        .map(str::trim)
        .find(|s| s.chars().count() > 20 && !is_bare_year(s))
        .and_then(tidy)
}

fn ends_with_initial(s: &str) -> bool {
    let mut rev = s.chars().rev();
    match (rev.next(), rev.next()) {
        (Some(last), Some(prev)) => last.is_uppercase() && (prev == ' ' || prev == ',' || prev == '-'),
        (Some(last), None) => last.is_uppercase(),
        _ => false,
    }
}

fn is_bare_year(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

// ── Authors ──

/// Text before the first period (or the first 100 characters), split on
/// commas when it looks like a list; up to 5 names, skipping bare years.
pub fn comma_separated_authors(text: &str) -> Option<Vec<Author>> {
    let head: String = match text.find('.') {
        Some(i) => text[..i].to_string(),
        None => text.chars().take(100).collect(),
    };
    if !head.contains(',') || head.chars().count() >= 200 {
        return None;
    }
    let authors: Vec<Author> = head
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_bare_year(s))
        .take(5)
        .map(Author::new)
        .collect();
    if authors.is_empty() { None } else { Some(authors) }
}

// ── Venue ──

/// A phrase containing a venue keyword, optionally introduced by "In". The
/// keyword may itself open the phrase ("Journal of ...").
pub fn keyword_venue(text: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?:\b[Ii]n\s+)?((?:[A-Z][^.]*?)?\b(?:Journal|Conference|Proceedings|Review|Letters|ACM|IEEE|Nature|Science)\b[^.]*)",
        )
        .unwrap()
    });
    let caps = RE.captures(text)?;
    tidy(caps.get(1)?.as_str())
}

// ── Identifiers ──

pub fn bare_doi(text: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(10\.\d{4,9}/[^\s,;]+)").unwrap());
    let caps = RE.captures(text)?;
    let doi = caps.get(1)?.as_str().trim_end_matches(['.', ')', ']', '>']);
    if doi.is_empty() { None } else { Some(doi.to_string()) }
}

pub fn http_url(text: &str) -> Option<String> {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s,;<>]+").unwrap());
    let url = RE.find(text)?.as_str().trim_end_matches(['.', ')', ']']);
    Some(url.to_string())
}
