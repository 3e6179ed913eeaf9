//! Greedy, order-dependent citation deduplication.
//!
//! Each incoming citation is compared against the citations accepted so far,
//! in acceptance order. The first accepted record it duplicates decides its
//! fate: the more complete of the two survives (ties keep the accepted one),
//! and a replacing record moves to the end of the accepted list. Merging is
//! not transitive: two records that only resemble each other, and not the
//! representative they were compared against, stay separate.

use std::collections::HashSet;

use crate::citation::Citation;
use crate::key::CitationKey;
use crate::matching::title_similarity;

/// Score above which two citations are considered the same work.
pub const DUPLICATE_THRESHOLD: f64 = 0.8;

/// Weights of the similarity components. Missing components contribute
/// nothing; the score is not renormalized over the available ones.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityWeights {
    pub title: f64,
    pub authors: f64,
    pub year: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            title: 0.6,
            authors: 0.3,
            year: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deduplicator {
    weights: SimilarityWeights,
    threshold: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: DUPLICATE_THRESHOLD,
        }
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Weighted similarity of two citations.
    ///
    /// * title: similarity ratio of the lowercase titles, when both are present
    /// * authors: `|common names| / max(|a|, |b|)`, when both lists are non-empty
    /// * year: full weight when both years are present and equal
    pub fn similarity(&self, a: &Citation, b: &Citation) -> f64 {
        let mut score = 0.0;

        if a.has_title() && b.has_title() {
            score += self.weights.title * title_similarity(a.title(), b.title());
        }

        if !a.authors.is_empty() && !b.authors.is_empty() {
            score += self.weights.authors * author_overlap(a, b);
        }

        if let (Some(ya), Some(yb)) = (a.year, b.year) {
            if ya == yb {
                score += self.weights.year;
            }
        }

        score
    }

    /// Whether two citations describe the same work.
    ///
    /// Either the weighted score clears the threshold, or both records carry a
    /// title and share the same [`CitationKey`] (same truncated title, year and
    /// first-author surname).
    pub fn is_duplicate(&self, a: &Citation, b: &Citation) -> bool {
        if self.similarity(a, b) > self.threshold {
            return true;
        }
        a.has_title() && b.has_title() && CitationKey::of(a) == CitationKey::of(b)
    }

    /// Deduplicate `citations`, preserving first-seen order except where a
    /// more complete duplicate replaces an earlier record.
    pub fn dedupe(&self, citations: Vec<Citation>) -> Vec<Citation> {
        let total = citations.len();
        let mut accepted: Vec<Citation> = Vec::with_capacity(total);

        for citation in citations {
            match accepted.iter().position(|a| self.is_duplicate(a, &citation)) {
                Some(i) => {
                    if citation.non_empty_field_count() > accepted[i].non_empty_field_count() {
                        tracing::trace!(
                            replaced = accepted[i].title(),
                            by = citation.title(),
                            "duplicate replaced by more complete record"
                        );
                        accepted.remove(i);
                        accepted.push(citation);
                    } else {
                        tracing::trace!(title = citation.title(), "duplicate dropped");
                    }
                }
                None => accepted.push(citation),
            }
        }

        tracing::debug!(
            input = total,
            output = accepted.len(),
            "deduplicated citations"
        );
        accepted
    }
}

/// Deduplicate with the default weights and threshold.
pub fn deduplicate(citations: Vec<Citation>) -> Vec<Citation> {
    Deduplicator::default().dedupe(citations)
}

fn author_overlap(a: &Citation, b: &Citation) -> f64 {
    let names_a: HashSet<String> = a.authors.iter().map(|x| x.name.trim().to_lowercase()).collect();
    let names_b: HashSet<String> = b.authors.iter().map(|x| x.name.trim().to_lowercase()).collect();
    let common = names_a.intersection(&names_b).count();
    let denom = a.authors.len().max(b.authors.len());
    if denom == 0 {
        0.0
    } else {
        common as f64 / denom as f64
    }
}
