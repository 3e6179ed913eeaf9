//! Batch enrichment of raw reference strings against metadata sources.
//!
//! References are processed in batches of `batch_size`. Inside a batch up to
//! `max_concurrency` lookups run at once; between batches the enricher pauses
//! for `batch_pause`. Every input reference yields exactly one
//! [`LookupOutcome`], in input order, whether or not a source matched it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::citation::Citation;
use crate::db::{MetadataSource, build_source_list};
use crate::rate_limit::{LookupError, lookup_with_rate_limit};
use crate::Config;

/// Why a reference fell back to locally parsed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Every source answered, none matched.
    NotFound,
    /// At least one source timed out and none matched.
    Timeout,
    /// At least one source failed and none matched.
    Error(String),
    /// Not looked up: cancelled, beyond `max_lookups`, or no sources enabled.
    Skipped,
}

/// The result of enriching one raw reference.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    Found {
        raw: String,
        citation: Citation,
        source: String,
    },
    Fallback {
        raw: String,
        reason: FallbackReason,
    },
}

impl LookupOutcome {
    pub fn raw(&self) -> &str {
        match self {
            LookupOutcome::Found { raw, .. } | LookupOutcome::Fallback { raw, .. } => raw,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found { .. })
    }

    /// Resolve to a citation, using `fallback` to parse the raw text when no
    /// source matched. The raw text is always retained on the result.
    pub fn into_citation(self, fallback: impl FnOnce(&str) -> Citation) -> Citation {
        match self {
            LookupOutcome::Found { raw, mut citation, .. } => {
                citation.raw_text = Some(raw);
                citation
            }
            LookupOutcome::Fallback { raw, .. } => {
                let mut citation = fallback(&raw);
                citation.raw_text = Some(raw);
                citation
            }
        }
    }
}

/// Progress events emitted during enrichment.
#[derive(Debug, Clone)]
pub enum EnrichEvent {
    Started {
        total: usize,
        lookups: usize,
    },
    Looking {
        index: usize,
        total: usize,
    },
    Result {
        index: usize,
        total: usize,
        outcome: Box<LookupOutcome>,
    },
    BatchPause {
        completed: usize,
        pause: Duration,
    },
}

/// Summary counts for one enrichment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl EnrichStats {
    pub fn from_outcomes(outcomes: &[LookupOutcome]) -> Self {
        let mut stats = EnrichStats {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                LookupOutcome::Found { .. } => stats.found += 1,
                LookupOutcome::Fallback { reason, .. } => match reason {
                    FallbackReason::NotFound => stats.not_found += 1,
                    FallbackReason::Timeout | FallbackReason::Error(_) => stats.failed += 1,
                    FallbackReason::Skipped => stats.skipped += 1,
                },
            }
        }
        stats
    }
}

pub struct Enricher {
    sources: Vec<Arc<dyn MetadataSource>>,
    client: reqwest::Client,
    config: Arc<Config>,
}

impl Enricher {
    /// Create an enricher querying the sources enabled in `config`.
    ///
    /// Fails only if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(config: Arc<Config>) -> Result<Self, reqwest::Error> {
        let sources = build_source_list(
            config.s2_api_key.as_deref(),
            config.crossref_mailto.as_deref(),
            &config.disabled_sources,
        );
        Self::with_sources(config, sources)
    }

    /// Create an enricher with an explicit source list, queried in order.
    pub fn with_sources(
        config: Arc<Config>,
        sources: Vec<Arc<dyn MetadataSource>>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_client(config, sources, client))
    }

    /// Create an enricher around an existing HTTP client.
    pub fn with_client(
        config: Arc<Config>,
        sources: Vec<Arc<dyn MetadataSource>>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            sources,
            client,
            config,
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Enrich every reference. The returned outcomes are in input order and
    /// one per reference; cancelled or capped references are `Skipped`.
    pub async fn enrich(
        &self,
        references: &[String],
        progress: impl Fn(EnrichEvent) + Send + Sync,
        cancel: &CancellationToken,
    ) -> Vec<LookupOutcome> {
        let total = references.len();
        let lookups = self
            .config
            .max_lookups
            .map_or(total, |cap| cap.min(total));
        progress(EnrichEvent::Started { total, lookups });

        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.max_concurrency.max(1);
        let indexed: Vec<(usize, &String)> = references.iter().enumerate().collect();
        let batch_count = indexed.chunks(batch_size).count();
        let mut outcomes = Vec::with_capacity(total);

        for (batch_index, batch) in indexed.chunks(batch_size).enumerate() {
            let progress = &progress;
            let results: Vec<LookupOutcome> = stream::iter(batch.iter().copied())
                .map(|(index, raw)| async move {
                    let outcome = if index >= lookups || cancel.is_cancelled() {
                        LookupOutcome::Fallback {
                            raw: raw.clone(),
                            reason: FallbackReason::Skipped,
                        }
                    } else {
                        progress(EnrichEvent::Looking { index, total });
                        self.lookup_one(raw).await
                    };
                    progress(EnrichEvent::Result {
                        index,
                        total,
                        outcome: Box::new(outcome.clone()),
                    });
                    outcome
                })
                .buffered(concurrency)
                .collect()
                .await;
            outcomes.extend(results);

            let completed = outcomes.len();
            let more_lookups = completed < lookups;
            let pause = self.config.batch_pause;
            if batch_index + 1 < batch_count && more_lookups && !pause.is_zero() && !cancel.is_cancelled() {
                progress(EnrichEvent::BatchPause { completed, pause });
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        let stats = EnrichStats::from_outcomes(&outcomes);
        tracing::info!(
            total = stats.total,
            found = stats.found,
            not_found = stats.not_found,
            failed = stats.failed,
            skipped = stats.skipped,
            "enrichment complete"
        );
        outcomes
    }

    /// Query sources in order until one matches.
    async fn lookup_one(&self, raw: &str) -> LookupOutcome {
        if self.sources.is_empty() {
            return LookupOutcome::Fallback {
                raw: raw.to_string(),
                reason: FallbackReason::Skipped,
            };
        }

        let timeout = self.config.lookup_timeout;
        let mut last_failure: Option<FallbackReason> = None;

        for source in &self.sources {
            let name = source.name();

            if let Some(cache) = &self.config.lookup_cache
                && let Some(cached) = cache.get(raw, name)
            {
                match cached {
                    Some(citation) => {
                        return LookupOutcome::Found {
                            raw: raw.to_string(),
                            citation,
                            source: name.to_string(),
                        };
                    }
                    None => continue,
                }
            }

            // The timeout bounds each request; rate-limit waits come on top.
            let result = lookup_with_rate_limit(
                source.as_ref(),
                raw,
                &self.client,
                timeout,
                &self.config.rate_limiters,
            )
            .await;

            match result {
                Ok(Some(citation)) => {
                    if let Some(cache) = &self.config.lookup_cache {
                        cache.insert(raw, name, Some(&citation));
                    }
                    tracing::debug!(source = name, title = citation.title(), "reference matched");
                    return LookupOutcome::Found {
                        raw: raw.to_string(),
                        citation,
                        source: name.to_string(),
                    };
                }
                Ok(None) => {
                    if let Some(cache) = &self.config.lookup_cache {
                        cache.insert(raw, name, None);
                    }
                }
                Err(LookupError::Timeout) => {
                    tracing::debug!(source = name, "lookup timed out");
                    last_failure = Some(FallbackReason::Timeout);
                }
                Err(e) => {
                    tracing::warn!(source = name, error = %e, "lookup failed");
                    last_failure = Some(FallbackReason::Error(format!("{name}: {e}")));
                }
            }
        }

        LookupOutcome::Fallback {
            raw: raw.to_string(),
            reason: last_failure.unwrap_or(FallbackReason::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LookupCache;
    use crate::db::mock::{MockResponse, MockSource};
    use std::sync::Mutex;

    fn config() -> Config {
        Config {
            batch_pause: Duration::ZERO,
            ..Default::default()
        }
    }

    fn refs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Reference number {i}, 2020.")).collect()
    }

    fn found(title: &str) -> MockResponse {
        MockResponse::Found(Citation {
            title: Some(title.into()),
            year: Some(2020),
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn one_outcome_per_reference_in_order() {
        let source = Arc::new(MockSource::new("Mock", found("Found Title")));
        let enricher = Enricher::with_sources(Arc::new(config()), vec![source.clone()]).unwrap();
        let input = refs(7);
        let out = enricher
            .enrich(&input, |_| {}, &CancellationToken::new())
            .await;
        assert_eq!(out.len(), 7);
        for (o, raw) in out.iter().zip(&input) {
            assert_eq!(o.raw(), raw);
            assert!(o.is_found());
        }
        assert_eq!(source.call_count(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_through_to_second_source() {
        let first = Arc::new(MockSource::new("First", MockResponse::NotFound));
        let second = Arc::new(MockSource::new("Second", found("From second")));
        let enricher =
            Enricher::with_sources(Arc::new(config()), vec![first.clone(), second.clone()]).unwrap();
        let out = enricher
            .enrich(&refs(1), |_| {}, &CancellationToken::new())
            .await;
        match &out[0] {
            LookupOutcome::Found { source, .. } => assert_eq!(source, "Second"),
            other => panic!("expected Found, got {other:?}"),
        }
        assert_eq!(first.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_become_fallback() {
        let source = Arc::new(MockSource::new("Mock", MockResponse::Error("boom".into())));
        let enricher = Enricher::with_sources(Arc::new(config()), vec![source]).unwrap();
        let out = enricher
            .enrich(&refs(2), |_| {}, &CancellationToken::new())
            .await;
        assert!(out.iter().all(|o| matches!(
            o,
            LookupOutcome::Fallback { reason: FallbackReason::Error(_), .. }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let source = Arc::new(
            MockSource::new("Slow", found("Late")).with_delay(Duration::from_secs(60)),
        );
        let cfg = Config {
            lookup_timeout: Duration::from_secs(1),
            ..config()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source]).unwrap();
        let out = enricher
            .enrich(&refs(1), |_| {}, &CancellationToken::new())
            .await;
        assert!(matches!(
            &out[0],
            LookupOutcome::Fallback { reason: FallbackReason::Timeout, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_wait_does_not_count_as_timeout() {
        let source = Arc::new(
            MockSource::with_sequence(
                "Mock",
                vec![
                    MockResponse::RateLimited {
                        retry_after: Some(Duration::from_secs(30)),
                    },
                    found("After the wait"),
                ],
            )
            .with_delay(Duration::from_millis(200)),
        );
        let cfg = Config {
            lookup_timeout: Duration::from_secs(10),
            ..config()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source.clone()]).unwrap();
        let out = enricher
            .enrich(&refs(1), |_| {}, &CancellationToken::new())
            .await;
        assert!(out[0].is_found(), "got {:?}", out[0]);
        assert_eq!(source.call_count(), 2);
    }

    #[test]
    fn new_builds_client_and_default_sources() {
        let enricher = Enricher::new(Arc::new(Config::default())).unwrap();
        assert!(!enricher.source_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn max_lookups_caps_queries() {
        let source = Arc::new(MockSource::new("Mock", found("T")));
        let cfg = Config {
            max_lookups: Some(3),
            ..config()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source.clone()]).unwrap();
        let out = enricher
            .enrich(&refs(10), |_| {}, &CancellationToken::new())
            .await;
        assert_eq!(out.len(), 10);
        assert_eq!(source.call_count(), 3);
        let stats = EnrichStats::from_outcomes(&out);
        assert_eq!(stats.found, 3);
        assert_eq!(stats.skipped, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_skips_everything() {
        let source = Arc::new(MockSource::new("Mock", found("T")));
        let enricher = Enricher::with_sources(Arc::new(config()), vec![source.clone()]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = enricher.enrich(&refs(4), |_| {}, &cancel).await;
        assert_eq!(out.len(), 4);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_short_circuits_repeat_lookups() {
        let source = Arc::new(MockSource::new("Mock", found("T")));
        let cfg = Config {
            lookup_cache: Some(Arc::new(LookupCache::default())),
            ..config()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source.clone()]).unwrap();
        let input = vec!["Same reference, 2020.".to_string(), "Same  reference 2020".to_string()];
        let first = enricher.enrich(&input[..1], |_| {}, &CancellationToken::new()).await;
        let second = enricher.enrich(&input[1..], |_| {}, &CancellationToken::new()).await;
        assert!(first[0].is_found() && second[0].is_found());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_not_cached() {
        let source = Arc::new(MockSource::with_sequence(
            "Mock",
            vec![MockResponse::Error("connection reset".into()), found("T")],
        ));
        let cfg = Config {
            lookup_cache: Some(Arc::new(LookupCache::default())),
            ..config()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source.clone()]).unwrap();
        let input = refs(1);
        let first = enricher.enrich(&input, |_| {}, &CancellationToken::new()).await;
        let second = enricher.enrich(&input, |_| {}, &CancellationToken::new()).await;
        assert!(!first[0].is_found());
        assert!(second[0].is_found());
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_pauses_are_reported() {
        let source = Arc::new(MockSource::new("Mock", MockResponse::NotFound));
        let cfg = Config {
            batch_size: 2,
            batch_pause: Duration::from_millis(500),
            ..Default::default()
        };
        let enricher = Enricher::with_sources(Arc::new(cfg), vec![source]).unwrap();
        let events = Mutex::new(Vec::new());
        enricher
            .enrich(
                &refs(5),
                |e| {
                    if let EnrichEvent::BatchPause { completed, .. } = e {
                        events.lock().unwrap().push(completed);
                    }
                },
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(*events.lock().unwrap(), vec![2, 4]);
    }

    #[test]
    fn fallback_keeps_raw_text() {
        let outcome = LookupOutcome::Fallback {
            raw: "Smith, J. A paper. 2020.".into(),
            reason: FallbackReason::NotFound,
        };
        let c = outcome.into_citation(|raw| Citation {
            title: Some(raw.to_string()),
            ..Default::default()
        });
        assert_eq!(c.raw_text.as_deref(), Some("Smith, J. A paper. 2020."));
    }

    #[test]
    fn found_keeps_raw_text() {
        let outcome = LookupOutcome::Found {
            raw: "raw".into(),
            citation: Citation {
                title: Some("T".into()),
                ..Default::default()
            },
            source: "Mock".into(),
        };
        let c = outcome.into_citation(|_| unreachable!());
        assert_eq!(c.raw_text.as_deref(), Some("raw"));
        assert_eq!(c.title.as_deref(), Some("T"));
    }
}
