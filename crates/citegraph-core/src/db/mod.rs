//! Metadata source trait and implementations for enriching raw references.

pub mod crossref;
pub mod semantic_scholar;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::citation::Citation;
use crate::rate_limit::LookupError;

pub use crossref::CrossRef;
pub use semantic_scholar::SemanticScholar;

/// Result of a metadata lookup: `None` means the source had no match.
pub type LookupResult = Result<Option<Citation>, LookupError>;

/// A scholarly metadata service that can resolve a free-text reference into
/// structured citation metadata.
pub trait MetadataSource: Send + Sync {
    /// The canonical name of this source (e.g., "Semantic Scholar").
    fn name(&self) -> &str;

    /// Search the source for the work a raw reference string describes.
    fn lookup<'a>(
        &'a self,
        reference: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>>;
}

/// Maximum query length sent to search endpoints.
pub(crate) const MAX_QUERY_CHARS: usize = 300;

/// Build the ordered list of enabled sources. Semantic Scholar is queried
/// first; CrossRef is the fallback.
pub fn build_source_list(
    s2_api_key: Option<&str>,
    crossref_mailto: Option<&str>,
    disabled: &[String],
) -> Vec<Arc<dyn MetadataSource>> {
    let is_disabled = |name: &str| disabled.iter().any(|d| d.eq_ignore_ascii_case(name));

    let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();
    if !is_disabled("Semantic Scholar") {
        sources.push(Arc::new(SemanticScholar {
            api_key: s2_api_key.map(String::from),
        }));
    }
    if !is_disabled("CrossRef") {
        sources.push(Arc::new(CrossRef {
            mailto: crossref_mailto.map(String::from),
        }));
    }
    sources
}
