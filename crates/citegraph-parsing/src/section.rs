use citegraph_core::backend::split_pages;

use crate::config::ParsingConfig;

/// The reference-bearing part of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSection {
    pub text: String,
    /// Zero-based page on which the header was found; `None` when no header
    /// matched and the whole document is used.
    pub header_page: Option<usize>,
}

impl ReferenceSection {
    pub fn found_header(&self) -> bool {
        self.header_page.is_some()
    }
}

/// Locate the references section across a document's pages.
///
/// Pages are scanned in order; the first page with a line matching one of the
/// configured section headers marks the start of reference-bearing content,
/// which runs from just after that header line to the end of the document (or
/// to the first end marker such as "Appendix"). Without any header the whole
/// document is returned.
pub fn locate_references(pages: &[String], config: &ParsingConfig) -> ReferenceSection {
    if let Some(header_re) = &config.header_re {
        for (page_index, page) in pages.iter().enumerate() {
            let Some(m) = header_re.find(page) else {
                continue;
            };

            let mut text = String::from(&page[m.end()..]);
            for later in &pages[page_index + 1..] {
                text.push('\n');
                text.push_str(later);
            }

            if let Some(end_re) = &config.end_re
                && let Some(end) = end_re.find(&text)
            {
                text.truncate(end.start());
            }

            tracing::debug!(page = page_index, "found references header");
            return ReferenceSection {
                text,
                header_page: Some(page_index),
            };
        }
    }

    tracing::debug!("no references header found, scanning whole document");
    ReferenceSection {
        text: pages.join("\n"),
        header_page: None,
    }
}

/// [`locate_references`] over a single string, split into pages on form feeds.
pub fn locate_references_in_text(text: &str, config: &ParsingConfig) -> ReferenceSection {
    locate_references(&split_pages(text), config)
}
