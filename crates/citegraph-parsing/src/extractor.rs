use std::path::Path;

use citegraph_core::{Citation, DocumentBackend};

use crate::config::ParsingConfig;
use crate::section::{self, ReferenceSection};
use crate::segment::{self, SegmentationResult, SegmentationStrategy};
use crate::{ParsingError, parser};

/// Output of a full extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    /// Cleaned reference strings, in order of appearance.
    pub references: Vec<String>,
    /// Strategy that produced `references`; `None` when nothing was found.
    pub strategy: Option<SegmentationStrategy>,
    /// Page on which the references header was found, if any.
    pub header_page: Option<usize>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Heuristic parse of every extracted reference.
    pub fn citations(&self) -> Vec<Citation> {
        self.references.iter().map(|r| parser::parse_citation(r)).collect()
    }
}

/// A configurable reference extraction pipeline.
///
/// Holds a [`ParsingConfig`] and exposes each pipeline step as a method.
/// The default constructor uses built-in defaults; use
/// [`ReferenceExtractor::with_config`] to supply custom headers and bounds.
#[derive(Debug, Clone, Default)]
pub struct ReferenceExtractor {
    config: ParsingConfig,
}

impl ReferenceExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Locate the reference-bearing text across pages (step 1).
    pub fn locate(&self, pages: &[String]) -> ReferenceSection {
        section::locate_references(pages, &self.config)
    }

    /// Split reference-bearing text into cleaned references (step 2).
    pub fn segment(&self, text: &str) -> SegmentationResult {
        segment::segment_references(text, &self.config)
    }

    /// Parse one cleaned reference string (step 3).
    pub fn parse(&self, reference: &str) -> Citation {
        parser::parse_citation(reference)
    }

    /// Run steps 1 and 2 over already-decoded pages.
    pub fn extract_from_pages(&self, pages: &[String]) -> ExtractionResult {
        let section = self.locate(pages);
        let segmented = self.segment(&section.text);
        tracing::debug!(
            header_page = ?section.header_page,
            strategy = ?segmented.strategy,
            count = segmented.references.len(),
            "extracted references"
        );
        ExtractionResult {
            references: segmented.references,
            strategy: segmented.strategy,
            header_page: section.header_page,
        }
    }

    /// Run steps 1 and 2 over a single string; form feeds separate pages.
    pub fn extract_from_text(&self, text: &str) -> ExtractionResult {
        self.extract_from_pages(&citegraph_core::backend::split_pages(text))
    }

    /// Decode `path` with `backend`, then extract. Only decoding can fail.
    pub fn extract_via_backend(
        &self,
        path: &Path,
        backend: &dyn DocumentBackend,
    ) -> Result<ExtractionResult, ParsingError> {
        let pages = backend.extract_pages(path)?;
        Ok(self.extract_from_pages(&pages))
    }
}
