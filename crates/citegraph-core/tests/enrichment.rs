//! End-to-end enrichment through the public API with an in-test source.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use citegraph_core::db::LookupResult;
use citegraph_core::{
    Author, Citation, Config, EnrichEvent, Enricher, FallbackReason, LookupError,
    LookupOutcome, MetadataSource, deduplicate,
};
use tokio_util::sync::CancellationToken;

/// Matches references that mention "attention", fails on ones that mention
/// "flaky", and finds nothing otherwise.
struct KeywordSource {
    calls: AtomicUsize,
}

impl MetadataSource for KeywordSource {
    fn name(&self) -> &str {
        "Keyword"
    }

    fn lookup<'a>(
        &'a self,
        reference: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let lower = reference.to_lowercase();
            if lower.contains("flaky") {
                return Err(LookupError::Other("connection reset".into()));
            }
            if lower.contains("attention") {
                return Ok(Some(Citation {
                    title: Some("Attention Is All You Need".into()),
                    authors: vec![Author::new("Ashish Vaswani")],
                    year: Some(2017),
                    venue: Some("NeurIPS".into()),
                    citation_count: Some(90_000),
                    ..Default::default()
                }));
            }
            Ok(None)
        })
    }
}

fn test_config() -> Config {
    Config {
        batch_size: 2,
        batch_pause: Duration::from_millis(100),
        lookup_cache: None,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn mixed_outcomes_keep_input_order() {
    let source = Arc::new(KeywordSource {
        calls: AtomicUsize::new(0),
    });
    let enricher = Enricher::with_sources(Arc::new(test_config()), vec![source.clone()]).unwrap();

    let refs = vec![
        "[1] Vaswani, A. et al. Attention is all you need. NeurIPS 2017.".to_string(),
        "[2] Smith, J. An obscure report. 1999.".to_string(),
        "[3] Doe, A. A flaky server paper. 2011.".to_string(),
    ];

    let events = std::sync::Mutex::new(Vec::new());
    let out = enricher
        .enrich(
            &refs,
            |e| {
                if let EnrichEvent::Result { index, .. } = e {
                    events.lock().unwrap().push(index);
                }
            },
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(out.len(), 3);
    assert!(matches!(&out[0], LookupOutcome::Found { source, .. } if source == "Keyword"));
    assert!(matches!(
        &out[1],
        LookupOutcome::Fallback { reason: FallbackReason::NotFound, .. }
    ));
    assert!(matches!(
        &out[2],
        LookupOutcome::Fallback { reason: FallbackReason::Error(_), .. }
    ));
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);

    let mut seen = events.into_inner().unwrap();
    seen.sort();
    assert_eq!(seen, vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn enriched_duplicates_collapse() {
    let source = Arc::new(KeywordSource {
        calls: AtomicUsize::new(0),
    });
    let enricher = Enricher::with_sources(Arc::new(test_config()), vec![source]).unwrap();

    // The same paper cited twice with different formatting.
    let refs = vec![
        "Vaswani et al. 2017. Attention is all you need.".to_string(),
        "A. Vaswani, N. Shazeer. Attention Is All You Need. In NIPS, 2017.".to_string(),
    ];
    let citations: Vec<Citation> = enricher
        .enrich(&refs, |_| {}, &CancellationToken::new())
        .await
        .into_iter()
        .map(|o| o.into_citation(|raw| Citation::from_raw(raw)))
        .collect();

    let unique = deduplicate(citations);
    assert_eq!(unique.len(), 1);
    assert_eq!(unique[0].year, Some(2017));
    assert!(unique[0].raw_text.is_some());
}
