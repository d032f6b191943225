//! Scripted in-process client for tests and offline runs.

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use switchboard_core::AppResult;

type Responder = dyn Fn(&LlmRequest) -> AppResult<LlmResponse> + Send + Sync;

/// An [`LlmClient`] whose answers come from a closure.
///
/// Every request is recorded so tests can assert on what was sent.
pub struct MockClient {
    responder: Arc<Responder>,
    calls: AtomicUsize,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockClient {
    /// Create a mock that answers every request with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&LlmRequest) -> AppResult<LlmResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A mock that always returns the same text.
    pub fn fixed(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(move |request| Ok(LlmResponse::text(content.clone(), request.model.clone())))
    }

    /// Number of completed `complete` calls.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request.clone());
        }
        (self.responder)(request)
    }
}
