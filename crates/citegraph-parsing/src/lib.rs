use std::path::Path;

use thiserror::Error;

pub mod config;
pub mod extractor;
pub mod parser;
pub mod section;
pub mod segment;
pub mod text_processing;

pub use config::{ListOverride, ParsingConfig, ParsingConfigBuilder};
pub use extractor::{ExtractionResult, ReferenceExtractor};
pub use parser::{FieldExtractor, first_match, parse_citation};
pub use section::ReferenceSection;
pub use segment::{SegmentationResult, SegmentationStrategy};
// Re-export domain types from core (canonical definitions live there)
pub use citegraph_core::{BackendError, Citation, DocumentBackend, PlainTextBackend};

#[derive(Error, Debug)]
pub enum ParsingError {
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("invalid section pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Extract references from a document using the given backend for decoding.
///
/// Pipeline:
/// 1. Decode the document into pages via `backend`
/// 2. Locate the References/Bibliography section (whole document if absent)
/// 3. Segment individual references with the first productive strategy
/// 4. Clean and length-filter each reference
///
/// A document without references yields an empty result; only an unreadable
/// input is an error.
pub fn extract_references(
    path: &Path,
    backend: &dyn DocumentBackend,
) -> Result<ExtractionResult, ParsingError> {
    ReferenceExtractor::new().extract_via_backend(path, backend)
}
