use std::path::Path;

use thiserror::Error;

/// Page separator emitted by common PDF-to-text tools (form feed).
pub const PAGE_BREAK: char = '\u{0C}';

/// The input document could not be read. This is the only failure class that
/// aborts the reference pipeline.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open document: {0}")]
    Open(String),
    #[error("document is not valid UTF-8 text: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for document text extraction backends.
///
/// Implementors provide the decoding step only; section detection and
/// reference segmentation live in `citegraph_parsing::ReferenceExtractor`.
pub trait DocumentBackend: Send + Sync {
    /// Extract the text of each page, in reading order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError>;

    /// Extract the full text content, pages joined by newlines.
    fn extract_text(&self, path: &Path) -> Result<String, BackendError> {
        Ok(self.extract_pages(path)?.join("\n"))
    }
}

/// Reads already-extracted UTF-8 text. Pages are separated by form feeds; a
/// file without any is a single page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextBackend;

impl PlainTextBackend {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentBackend for PlainTextBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        if !path.is_file() {
            return Err(BackendError::Open(format!("{} is not a file", path.display())));
        }
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(split_pages(&text))
    }
}

/// Split text into pages on form feeds, dropping a trailing empty page.
/// CRLF line endings become LF.
pub fn split_pages(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}
