//! Mock metadata source for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{LookupResult, MetadataSource};
use crate::citation::Citation;
use crate::rate_limit::LookupError;

/// A configurable mock response for [`MockSource`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a successful match.
    Found(Citation),
    /// Simulate "no match in this source".
    NotFound,
    /// Simulate a 429 rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// Simulate a generic error.
    Error(String),
}

/// A hand-rolled mock implementing [`MetadataSource`] for tests.
///
/// Returns a fixed response, or a sequence of responses (one per call,
/// repeating the last), with optional per-call latency.
pub struct MockSource {
    name: &'static str,
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockSource {
    /// Create a mock that always returns `response`.
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(name: &'static str, mut responses: Vec<MockResponse>) -> Self {
        assert!(!responses.is_empty(), "sequence must have at least one response");
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            name,
            responses: Mutex::new(responses),
            fallback,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `lookup()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl MetadataSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    fn lookup<'a>(
        &'a self,
        _reference: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            match response {
                MockResponse::Found(citation) => Ok(Some(citation)),
                MockResponse::NotFound => Ok(None),
                MockResponse::RateLimited { retry_after } => {
                    Err(LookupError::RateLimited { retry_after })
                }
                MockResponse::Error(msg) => Err(LookupError::Other(msg)),
            }
        })
    }
}
