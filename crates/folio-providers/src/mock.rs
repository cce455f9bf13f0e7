//! Test doubles for provider traits.
//!
//! Useful in unit and integration tests that drive the pipeline
//! without network access. Requests are recorded so tests can assert
//! on prompt content and call ordering.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use folio_core::provider::{
    CoverSpec, ImageGenerator, ProviderError, TextGenerator, TextRequest,
};

/// Scripted text generator.
///
/// Pops queued results in order; once the queue is empty every call
/// returns `default_response`. All received requests are recorded.
pub struct MockTextGenerator {
    scripted: Mutex<VecDeque<Result<String, ProviderError>>>,
    default_response: String,
    calls: Mutex<Vec<TextRequest>>,
}

impl MockTextGenerator {
    /// Mock that always returns the given text.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default_response: response.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result to return before falling back to the default.
    pub fn push_result(&self, result: Result<String, ProviderError>) {
        if let Ok(mut scripted) = self.scripted.lock() {
            scripted.push_back(result);
        }
    }

    /// Queue `n` retryable failures ahead of the default response.
    pub fn fail_times(&self, n: usize) {
        for _ in 0..n {
            self.push_result(Err(ProviderError::Http("simulated failure".to_string())));
        }
    }

    /// Requests received so far, in call order.
    pub fn recorded_calls(&self) -> Vec<TextRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl Default for MockTextGenerator {
    fn default() -> Self {
        Self::with_response("mock response")
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, request: TextRequest) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }
        let scripted = self
            .scripted
            .lock()
            .ok()
            .and_then(|mut scripted| scripted.pop_front());
        match scripted {
            Some(result) => result,
            None => Ok(self.default_response.clone()),
        }
    }
}

/// Mock cover generator returning a deterministic asset URL.
pub struct MockImageGenerator {
    fail_remaining: AtomicUsize,
    calls: AtomicUsize,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            fail_remaining: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock whose next `n` calls fail with a retryable error.
    pub fn failing(n: usize) -> Self {
        Self {
            fail_remaining: AtomicUsize::new(n),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate_cover(&self, spec: &CoverSpec) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Http("simulated image failure".to_string()));
        }
        Ok(format!(
            "https://assets.example.com/covers/{:?}/{}.png",
            spec.style,
            spec.title.to_lowercase().replace(' ', "-")
        ))
    }
}
