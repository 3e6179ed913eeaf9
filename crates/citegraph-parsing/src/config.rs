use regex::Regex;

use citegraph_core::config_file::ParsingSection;

/// Section headers recognized by default.
pub const DEFAULT_SECTION_HEADERS: &[&str] = &["References", "Bibliography"];

/// Headings that end the reference-bearing text when they appear on a line
/// of their own after the references header.
pub const DEFAULT_END_MARKERS: &[&str] = &[
    "Appendix",
    "Appendices",
    "Acknowledgments",
    "Acknowledgements",
    "Supplementary Material",
];

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Configuration for the reference extraction pipeline.
///
/// Header and end-marker names are compiled once into line-anchored,
/// case-insensitive regexes. Use [`ParsingConfigBuilder`] to construct.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    pub(crate) section_headers: Vec<String>,
    /// `None` when no header names are configured: the whole document is scanned.
    pub(crate) header_re: Option<Regex>,
    pub(crate) end_re: Option<Regex>,
    /// Shortest reference kept by the post-filter, in characters.
    pub(crate) min_reference_chars: usize,
    /// Longest reference kept by the post-filter, in characters.
    pub(crate) max_reference_chars: usize,
    /// Period-delimited fallback candidates must be longer than this.
    pub(crate) min_fallback_chars: usize,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        ParsingConfigBuilder::new()
            .build()
            .expect("default section patterns are valid")
    }
}

impl ParsingConfig {
    pub fn section_headers(&self) -> &[String] {
        &self.section_headers
    }

    pub fn min_reference_chars(&self) -> usize {
        self.min_reference_chars
    }

    pub fn max_reference_chars(&self) -> usize {
        self.max_reference_chars
    }
}

/// Builder for [`ParsingConfig`].
///
/// Accepts heading names (matched literally, case-insensitively, with any
/// run of whitespace between words) and compiles them in
/// [`build()`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    section_headers: ListOverride<String>,
    end_markers: ListOverride<String>,
    min_reference_chars: Option<usize>,
    max_reference_chars: Option<usize>,
    min_fallback_chars: Option<usize>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a `[parsing]` section from the on-disk config. Headers and end
    /// markers given there replace the defaults.
    pub fn from_section(section: &ParsingSection) -> Self {
        let mut builder = Self::new();
        if let Some(headers) = &section.section_headers {
            builder = builder.set_section_headers(headers.clone());
        }
        if let Some(markers) = &section.end_markers {
            builder = builder.set_end_markers(markers.clone());
        }
        if let Some(n) = section.min_reference_chars {
            builder = builder.min_reference_chars(n);
        }
        if let Some(n) = section.max_reference_chars {
            builder = builder.max_reference_chars(n);
        }
        builder
    }

    // ── Section headers ──

    pub fn set_section_headers(mut self, headers: Vec<String>) -> Self {
        self.section_headers = ListOverride::Replace(headers);
        self
    }

    pub fn add_section_header(mut self, header: String) -> Self {
        match &mut self.section_headers {
            ListOverride::Extend(v) => v.push(header),
            _ => self.section_headers = ListOverride::Extend(vec![header]),
        }
        self
    }

    // ── End markers ──

    pub fn set_end_markers(mut self, markers: Vec<String>) -> Self {
        self.end_markers = ListOverride::Replace(markers);
        self
    }

    pub fn add_end_marker(mut self, marker: String) -> Self {
        match &mut self.end_markers {
            ListOverride::Extend(v) => v.push(marker),
            _ => self.end_markers = ListOverride::Extend(vec![marker]),
        }
        self
    }

    // ── Scalars ──

    pub fn min_reference_chars(mut self, n: usize) -> Self {
        self.min_reference_chars = Some(n);
        self
    }

    pub fn max_reference_chars(mut self, n: usize) -> Self {
        self.max_reference_chars = Some(n);
        self
    }

    pub fn min_fallback_chars(mut self, n: usize) -> Self {
        self.min_fallback_chars = Some(n);
        self
    }

    /// Compile the heading names into regexes and produce a [`ParsingConfig`].
    pub fn build(self) -> Result<ParsingConfig, regex::Error> {
        let defaults = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let section_headers: Vec<String> = self
            .section_headers
            .resolve(&defaults(DEFAULT_SECTION_HEADERS))
            .into_iter()
            .filter(|h| !h.trim().is_empty())
            .collect();
        let end_markers: Vec<String> = self
            .end_markers
            .resolve(&defaults(DEFAULT_END_MARKERS))
            .into_iter()
            .filter(|h| !h.trim().is_empty())
            .collect();

        // A header line may carry a section number ("7.", "VII") and a colon.
        let header_re = if section_headers.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?im)^[ \t]*(?:(?:\d+|[IVXLC]+)\.?[ \t]+)?(?:{})[ \t]*:?[ \t]*\r?$",
                alternation(&section_headers)
            ))?)
        };

        let end_re = if end_markers.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?im)^[ \t]*(?:(?:\d+|[A-Z])\.?[ \t]+)?(?:{})\b[^\n]{{0,60}}$",
                alternation(&end_markers)
            ))?)
        };

        Ok(ParsingConfig {
            section_headers,
            header_re,
            end_re,
            min_reference_chars: self.min_reference_chars.unwrap_or(20),
            max_reference_chars: self.max_reference_chars.unwrap_or(2000),
            min_fallback_chars: self.min_fallback_chars.unwrap_or(50),
        })
    }
}

/// `a|b|c` of escaped names, internal whitespace matching any run of blanks.
fn alternation(names: &[String]) -> String {
    names
        .iter()
        .map(|name| {
            name.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}
