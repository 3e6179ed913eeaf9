//! Per-source rate limiting with adaptive governor instances.
//!
//! Each lookup waits for its governor permit via `until_ready()`, which
//! spaces requests at the configured rate. On 429, the governor is slowed,
//! `Retry-After` is honored, and the lookup is retried once.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use thiserror::Error;

use crate::citation::Citation;
use crate::db::MetadataSource;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Why a metadata lookup produced no answer.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("rate limited (429){}", retry_after.map(|d| format!(", retry after {:.1}s", d.as_secs_f64())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("lookup timed out")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

impl From<String> for LookupError {
    fn from(s: String) -> Self {
        LookupError::Other(s)
    }
}

/// Per-source rate limiter with adaptive rate adjustment via ArcSwap.
///
/// When a 429 is received, the governor is atomically swapped to a slower rate.
/// After a cooldown period (60s) with no 429s, the original rate is restored.
pub struct AdaptiveLimiter {
    limiter: ArcSwap<DirectLimiter>,
    base_period: Duration,
    /// Current slowdown factor (1 = normal, 2 = half rate, etc.).
    current_factor: AtomicU32,
    last_429: std::sync::Mutex<Option<Instant>>,
}

impl AdaptiveLimiter {
    /// Create a new limiter with the given period between requests.
    pub fn new(period: Duration) -> Self {
        Self {
            limiter: ArcSwap::from(Arc::new(DirectLimiter::direct(quota_for(period)))),
            base_period: period,
            current_factor: AtomicU32::new(1),
            last_429: std::sync::Mutex::new(None),
        }
    }

    /// Create a limiter allowing `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        let ms = 1000 / n.max(1) as u64;
        Self::new(Duration::from_millis(ms))
    }

    /// Wait until the rate limiter allows a request.
    pub async fn acquire(&self) {
        self.try_decay();
        let limiter = self.limiter.load();
        limiter.until_ready().await;
    }

    /// Called when a 429 is received. Doubles the slowdown factor (capped at
    /// 16x) and swaps the governor.
    pub fn on_rate_limited(&self) {
        if let Ok(mut last) = self.last_429.lock() {
            *last = Some(Instant::now());
        }

        let _ = self
            .current_factor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| {
                Some((f * 2).min(16))
            });

        let factor = self.current_factor.load(Ordering::SeqCst);
        if let Some(scaled) = self.base_period.checked_mul(factor) {
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(scaled))));
        }
    }

    /// Current slowdown factor.
    pub fn factor(&self) -> u32 {
        self.current_factor.load(Ordering::SeqCst)
    }

    pub fn base_period(&self) -> Duration {
        self.base_period
    }

    /// If 60s have passed since the last 429, restore the original rate.
    fn try_decay(&self) {
        let should_restore = self
            .last_429
            .lock()
            .ok()
            .and_then(|last| last.map(|t| t.elapsed().as_secs() >= 60))
            .unwrap_or(false);

        if should_restore && self.current_factor.load(Ordering::SeqCst) > 1 {
            self.current_factor.store(1, Ordering::SeqCst);
            self.limiter
                .store(Arc::new(DirectLimiter::direct(quota_for(self.base_period))));
        }
    }
}

fn quota_for(period: Duration) -> Quota {
    Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
}

/// Collection of per-source rate limiters.
pub struct RateLimiters {
    limiters: HashMap<&'static str, AdaptiveLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl RateLimiters {
    /// Build rate limiters based on whether API keys/mailto are configured.
    pub fn new(has_crossref_mailto: bool, has_s2_api_key: bool) -> Self {
        let mut limiters = HashMap::new();

        // CrossRef: 1/s anonymous, 3/s in the polite pool
        let crossref_rate = if has_crossref_mailto { 3 } else { 1 };
        limiters.insert("CrossRef", AdaptiveLimiter::per_second(crossref_rate));

        // Semantic Scholar: keyless ~100 req/5min, keyed 1/s
        if has_s2_api_key {
            limiters.insert("Semantic Scholar", AdaptiveLimiter::per_second(1));
        } else {
            limiters.insert(
                "Semantic Scholar",
                AdaptiveLimiter::new(Duration::from_secs(3)),
            );
        }

        Self { limiters }
    }

    /// Get the rate limiter for a given source, if one exists.
    pub fn get(&self, source_name: &str) -> Option<&AdaptiveLimiter> {
        self.limiters.get(source_name)
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), LookupError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(LookupError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: use a conservative fixed wait
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Look a reference up with proactive governor rate limiting.
///
/// 1. Acquires the per-source governor (waits if needed)
/// 2. Calls `source.lookup()`, bounded by `timeout`
/// 3. On 429: slows the governor, sleeps for `Retry-After` (capped at
///    `timeout`), then retries once with a fresh `timeout`
///
/// Governor waits and the `Retry-After` sleep do not count against
/// `timeout`.
pub async fn lookup_with_rate_limit(
    source: &dyn MetadataSource,
    reference: &str,
    client: &reqwest::Client,
    timeout: Duration,
    rate_limiters: &RateLimiters,
) -> Result<Option<Citation>, LookupError> {
    let limiter = rate_limiters.get(source.name());

    if let Some(lim) = limiter {
        lim.acquire().await;
    }

    match timed_lookup(source, reference, client, timeout).await {
        Err(LookupError::RateLimited { retry_after }) => {
            if let Some(lim) = limiter {
                lim.on_rate_limited();
            }

            let wait = retry_after.unwrap_or(Duration::from_secs(2)).min(timeout);
            tracing::info!(
                source = source.name(),
                wait_secs = wait.as_secs_f64(),
                "rate limited, waiting then retrying"
            );
            tokio::time::sleep(wait).await;

            if let Some(lim) = limiter {
                lim.acquire().await;
            }

            timed_lookup(source, reference, client, timeout).await
        }
        other => other,
    }
}

async fn timed_lookup(
    source: &dyn MetadataSource,
    reference: &str,
    client: &reqwest::Client,
    timeout: Duration,
) -> Result<Option<Citation>, LookupError> {
    tokio::time::timeout(timeout, source.lookup(reference, client, timeout))
        .await
        .unwrap_or(Err(LookupError::Timeout))
}
