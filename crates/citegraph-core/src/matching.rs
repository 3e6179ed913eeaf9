use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Collapse runs of whitespace (including newlines) into single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize text for keyed comparison: lowercase alphanumerics only.
///
/// Steps (order matters):
/// 1. Unescape common HTML entities
/// 2. Expand typographic ligatures left over from PDF extraction
/// 3. Unicode NFKD normalization (decomposes accents)
/// 4. Strip to ASCII
/// 5. Keep only `[a-zA-Z0-9]`
/// 6. Lowercase
pub fn normalize_title(title: &str) -> String {
    let title = title
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'");

    let title = title
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    let normalized: String = title.nfkd().filter(|c| c.is_ascii()).collect();

    static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());
    NON_ALNUM.replace_all(&normalized, "").to_lowercase()
}

/// Normalized similarity ratio (0.0–1.0) of two titles, compared lowercase
/// with whitespace collapsed.
///
/// Symmetric in its arguments. Two empty titles are identical (1.0); callers
/// that treat a missing title as "no signal" must check for that themselves.
pub fn title_similarity(title_a: &str, title_b: &str) -> f64 {
    let a = normalize_whitespace(title_a).to_lowercase();
    let b = normalize_whitespace(title_b).to_lowercase();
    if a == b {
        return 1.0;
    }
    rapidfuzz::fuzz::ratio(a.chars(), b.chars())
}

/// Whether a candidate title returned by a metadata search plausibly belongs
/// to the free-text reference it was looked up with.
///
/// The normalized title must appear inside the normalized reference and be
/// long enough to be meaningful.
pub fn reference_mentions_title(reference: &str, title: &str) -> bool {
    let norm_title = normalize_title(title);
    if norm_title.len() < 10 {
        return false;
    }
    normalize_title(reference).contains(&norm_title)
}

/// Build a search query from a raw reference string.
///
/// URLs and DOIs are dropped (search engines match them poorly), whitespace is
/// collapsed, and the query is capped at `max_chars` characters on a word
/// boundary.
pub fn search_query(reference: &str, max_chars: usize) -> String {
    static URL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(?:https?://\S+|doi:\s*\S+|\b10\.\d{4,9}/\S+|arxiv:\s*\S+)").unwrap()
    });
    let stripped = URL_RE.replace_all(reference, " ");
    let collapsed = normalize_whitespace(&stripped);

    let mut query = String::new();
    for word in collapsed.split(' ') {
        let extra = if query.is_empty() { 0 } else { 1 };
        if query.chars().count() + word.chars().count() + extra > max_chars {
            break;
        }
        if extra == 1 {
            query.push(' ');
        }
        query.push_str(word);
    }
    query
}
