use once_cell::sync::Lazy;
use regex::Regex;

use citegraph_core::matching::normalize_whitespace;

use crate::config::ParsingConfig;

/// Compound-word suffixes after which a line-break hyphen is kept.
const COMPOUND_SUFFIXES: &[&str] = &[
    "based", "driven", "aware", "oriented", "specific", "related", "dependent", "independent",
    "like", "free", "scale", "level", "order", "time", "world", "shot", "grained", "art",
];

/// Expand common typographic ligatures found in extracted PDF text.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Append a continuation line to a reference being assembled.
///
/// A line ending in a letter and hyphen is glued to the next line. When the
/// next word is lowercase and not a compound suffix the hyphen is a syllable
/// break and is removed (`"detec-" + "tion"` → `"detection"`).
pub fn append_line(current: &mut String, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if current.is_empty() {
        current.push_str(line);
        return;
    }

    let ends_with_break = current.ends_with('-')
        && current
            .chars()
            .rev()
            .nth(1)
            .is_some_and(|c| c.is_alphabetic());
    let next_word: String = line
        .chars()
        .take_while(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let starts_lower = line.chars().next().is_some_and(|c| c.is_lowercase());

    if ends_with_break {
        if starts_lower && !COMPOUND_SUFFIXES.contains(&next_word.as_str()) {
            current.pop();
        }
        current.push_str(line);
    } else {
        current.push(' ');
        current.push_str(line);
    }
}

/// Strip a leading `[12]`, `(12)`, `12.` or `12` marker from a reference.
pub fn strip_reference_prefix(text: &str) -> &str {
    static PREFIX_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\s*(?:\[\d+\]|\(\d+\)|\d{1,3}[.)]?(?:\s|$))\s*").unwrap());
    match PREFIX_RE.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

/// Clean one candidate: drop the numeric marker and collapse whitespace.
pub fn clean_reference(text: &str) -> String {
    normalize_whitespace(strip_reference_prefix(&expand_ligatures(text)))
}

/// Whether a cleaned reference is plausible: within the configured length
/// bounds and containing at least one letter.
pub fn is_plausible_reference(text: &str, config: &ParsingConfig) -> bool {
    let len = text.chars().count();
    len >= config.min_reference_chars
        && len <= config.max_reference_chars
        && text.chars().any(char::is_alphabetic)
}

/// Clean every candidate and keep only plausible ones, in order.
pub fn post_filter(candidates: Vec<String>, config: &ParsingConfig) -> Vec<String> {
    candidates
        .iter()
        .map(|c| clean_reference(c))
        .filter(|c| is_plausible_reference(c, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(lines: &[&str]) -> String {
        let mut s = String::new();
        for l in lines {
            append_line(&mut s, l);
        }
        s
    }

    #[test]
    fn syllable_break_is_joined() {
        assert_eq!(joined(&["Object detec-", "tion in the wild"]), "Object detection in the wild");
    }

    #[test]
    fn compound_hyphen_is_kept() {
        assert_eq!(joined(&["A data-", "driven approach"]), "A data-driven approach");
    }

    #[test]
    fn hyphen_before_capital_is_kept() {
        assert_eq!(joined(&["Smith, J. and Jean-", "Pierre, A."]), "Smith, J. and Jean-Pierre, A.");
    }

    #[test]
    fn plain_lines_are_space_joined() {
        assert_eq!(joined(&["  first part ", "", "second part"]), "first part second part");
    }

    #[test]
    fn strips_markers() {
        assert_eq!(strip_reference_prefix("[12] Smith, J."), "Smith, J.");
        assert_eq!(strip_reference_prefix("(3) Smith, J."), "Smith, J.");
        assert_eq!(strip_reference_prefix("  4. Smith, J."), "Smith, J.");
        assert_eq!(strip_reference_prefix("Smith, J. 2020."), "Smith, J. 2020.");
    }

    #[test]
    fn year_at_start_is_not_a_marker() {
        assert_eq!(strip_reference_prefix("2020. A report."), "2020. A report.");
    }

    #[test]
    fn post_filter_bounds() {
        let config = ParsingConfig::default();
        let long = format!("[1] {}", "word ".repeat(500));
        let out = post_filter(
            vec![
                "[1] Smith, J. (2020). A Great Paper.".into(),
                "[2] Too short.".into(),
                "[3] 1234 5678 9012 3456 7890 1234".into(),
                long,
            ],
            &config,
        );
        assert_eq!(out, vec!["Smith, J. (2020). A Great Paper.".to_string()]);
    }

    #[test]
    fn clean_collapses_whitespace_and_ligatures() {
        assert_eq!(
            clean_reference("[7]  E\u{FB03}cient\n   search   methods, 2021."),
            "Efficient search methods, 2021."
        );
    }
}
