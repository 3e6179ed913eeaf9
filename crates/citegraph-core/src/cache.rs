//! In-memory cache for metadata lookups.
//!
//! Backed by a [`DashMap`] so concurrent lookups never block each other.
//! Keys use [`normalize_title`](crate::matching::normalize_title) on the raw
//! reference so whitespace, punctuation and diacritic variants of the same
//! reference share an entry. Only definitive answers (found or not found)
//! are cached; transient errors are never stored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::citation::Citation;
use crate::matching::normalize_title;

/// Default time-to-live for positive (found) cache entries: 7 days.
pub const DEFAULT_POSITIVE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default time-to-live for negative (not found) cache entries: 24 hours.
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
struct CacheKey {
    normalized_reference: String,
    source: String,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    result: Option<Citation>,
    inserted_at: Instant,
}

pub struct LookupCache {
    entries: DashMap<CacheKey, CacheEntry>,
    positive_ttl: Duration,
    negative_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for LookupCache {
    fn default() -> Self {
        Self::new(DEFAULT_POSITIVE_TTL, DEFAULT_NEGATIVE_TTL)
    }
}

impl LookupCache {
    pub fn new(positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            positive_ttl,
            negative_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a cached answer for `reference` from `source`.
    ///
    /// Outer `None` is a cache miss; `Some(None)` is a cached "not found".
    pub fn get(&self, reference: &str, source: &str) -> Option<Option<Citation>> {
        let key = key_for(reference, source);

        if let Some(entry) = self.entries.get(&key) {
            let ttl = if entry.result.is_some() {
                self.positive_ttl
            } else {
                self.negative_ttl
            };
            if entry.inserted_at.elapsed() <= ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(source, "cache hit");
                return Some(entry.result.clone());
            }
            drop(entry);
            self.entries.remove(&key);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(source, "cache miss");
        None
    }

    /// Record a definitive answer. If `negative_ttl` is zero, "not found"
    /// answers are never cached.
    pub fn insert(&self, reference: &str, source: &str, result: Option<&Citation>) {
        if result.is_none() && self.negative_ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key_for(reference, source),
            CacheEntry {
                result: result.cloned(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop all cached "not found" answers. Returns how many were removed.
    pub fn clear_not_found(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.result.is_some());
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for LookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupCache")
            .field("entries", &self.entries.len())
            .field("positive_ttl", &self.positive_ttl)
            .field("negative_ttl", &self.negative_ttl)
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

fn key_for(reference: &str, source: &str) -> CacheKey {
    CacheKey {
        normalized_reference: normalize_title(reference),
        source: source.to_string(),
    }
}
