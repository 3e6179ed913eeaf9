use std::sync::Arc;
use std::time::Duration;

pub mod backend;
pub mod cache;
pub mod citation;
pub mod config_file;
pub mod db;
pub mod dedup;
pub mod enrich;
pub mod key;
pub mod matching;
pub mod rate_limit;

// Re-export for convenience
pub use backend::{BackendError, DocumentBackend, PlainTextBackend};
pub use cache::{DEFAULT_NEGATIVE_TTL, DEFAULT_POSITIVE_TTL, LookupCache};
pub use citation::{Author, Citation, MAX_YEAR, MIN_YEAR, MainPaper, is_plausible_year};
pub use db::{MetadataSource, build_source_list};
pub use dedup::{DUPLICATE_THRESHOLD, Deduplicator, SimilarityWeights, deduplicate};
pub use enrich::{EnrichEvent, EnrichStats, Enricher, FallbackReason, LookupOutcome};
pub use key::CitationKey;
pub use rate_limit::{LookupError, RateLimiters};

/// Configuration for metadata enrichment.
#[derive(Clone)]
pub struct Config {
    pub s2_api_key: Option<String>,
    pub crossref_mailto: Option<String>,
    /// Source names to skip (case-insensitive), e.g. `["CrossRef"]`.
    pub disabled_sources: Vec<String>,
    /// Upper bound for a single source lookup, including a rate-limit retry.
    pub lookup_timeout: Duration,
    /// Lookups in flight at once within a batch.
    pub max_concurrency: usize,
    pub batch_size: usize,
    /// Pause between batches, to stay polite with public APIs.
    pub batch_pause: Duration,
    /// Only the first `max_lookups` references are looked up; the rest fall
    /// back to local parsing. `None` looks up everything.
    pub max_lookups: Option<usize>,
    pub rate_limiters: Arc<RateLimiters>,
    pub lookup_cache: Option<Arc<LookupCache>>,
    /// TTL in seconds for positive (found) cache entries. Default: 7 days.
    pub cache_positive_ttl_secs: u64,
    /// TTL in seconds for negative (not-found) cache entries. Default: 24 hours.
    pub cache_negative_ttl_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("s2_api_key", &self.s2_api_key.as_ref().map(|_| "***"))
            .field(
                "crossref_mailto",
                &self.crossref_mailto.as_ref().map(|_| "***"),
            )
            .field("disabled_sources", &self.disabled_sources)
            .field("lookup_timeout", &self.lookup_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .field("batch_size", &self.batch_size)
            .field("batch_pause", &self.batch_pause)
            .field("max_lookups", &self.max_lookups)
            .field(
                "lookup_cache",
                &self.lookup_cache.as_ref().map(|c| format!("{:?}", c)),
            )
            .field("cache_positive_ttl_secs", &self.cache_positive_ttl_secs)
            .field("cache_negative_ttl_secs", &self.cache_negative_ttl_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            s2_api_key: None,
            crossref_mailto: None,
            disabled_sources: vec![],
            lookup_timeout: Duration::from_secs(10),
            max_concurrency: 3,
            batch_size: 5,
            batch_pause: Duration::from_millis(1000),
            max_lookups: None,
            rate_limiters: Arc::new(RateLimiters::default()),
            lookup_cache: Some(Arc::new(LookupCache::default())),
            cache_positive_ttl_secs: DEFAULT_POSITIVE_TTL.as_secs(),
            cache_negative_ttl_secs: DEFAULT_NEGATIVE_TTL.as_secs(),
        }
    }
}

impl Config {
    /// Rebuild the rate limiters and cache after keys or TTLs changed.
    pub fn finalize(mut self) -> Self {
        self.rate_limiters = Arc::new(RateLimiters::new(
            self.crossref_mailto.is_some(),
            self.s2_api_key.is_some(),
        ));
        self.lookup_cache = Some(build_lookup_cache(
            self.cache_positive_ttl_secs,
            self.cache_negative_ttl_secs,
        ));
        self
    }
}

/// Build a [`LookupCache`] from TTLs in seconds.
pub fn build_lookup_cache(positive_ttl_secs: u64, negative_ttl_secs: u64) -> Arc<LookupCache> {
    Arc::new(LookupCache::new(
        Duration::from_secs(positive_ttl_secs),
        Duration::from_secs(negative_ttl_secs),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let config = Config {
            s2_api_key: Some("very-secret".into()),
            crossref_mailto: Some("me@example.org".into()),
            ..Default::default()
        };
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("very-secret"));
        assert!(!dbg.contains("me@example.org"));
        assert!(dbg.contains("***"));
    }

    #[test]
    fn finalize_speeds_up_polite_crossref() {
        let anon = Config::default().finalize();
        let polite = Config {
            crossref_mailto: Some("me@example.org".into()),
            ..Default::default()
        }
        .finalize();
        let period = |c: &Config| c.rate_limiters.get("CrossRef").unwrap().base_period();
        assert!(period(&polite) < period(&anon));
    }
}
