//! Text-generation backend trait and implementations.
//!
//! This module defines the abstraction layer the pipeline talks to and
//! provides a scripted mock implementation for testing.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result, is_retryable};
use crate::types::{GenerateRequest, GenerateResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async operation with exponential backoff retry.
///
/// Retries only on transient errors (network failures). Non-retryable errors
/// are returned immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    backend_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut backoff = initial_backoff;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if !is_retryable(&e) || attempt >= max_retries => return Err(e),
            Err(e) => {
                attempt += 1;
                tracing::warn!(
                    backend = backend_name,
                    attempt = attempt,
                    max_retries = max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for text-generation providers.
///
/// Implementations must tolerate concurrent use: the pipeline shares one
/// backend across every question of a batch.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate text for a single prompt (non-streaming).
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// List the identifiers of the models installed on the service.
    async fn list_models(&self) -> Result<BTreeSet<String>>;

    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Human-readable location of the service, used in error messages.
    fn endpoint(&self) -> String {
        self.name().to_string()
    }

    /// Check if the backend is reachable.
    async fn health_check(&self) -> Result<()> {
        self.list_models().await.map(|_| ())
    }
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted reply from [`MockBackend`].
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Reply with this text.
    Text(String),
    /// Fail as if the requested model were not installed.
    ModelNotFound,
    /// Fail as if the service were down.
    Unreachable,
}

#[cfg(any(test, feature = "testing"))]
impl MockResponse {
    /// Shorthand for a text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order, then the fallback response (if
/// any) for every further call. Every request is logged.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    models: BTreeSet<String>,
    responses: parking_lot::Mutex<std::collections::VecDeque<MockResponse>>,
    fallback: Option<MockResponse>,
    request_log: parking_lot::Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

#[cfg(any(test, feature = "testing"))]
impl MockBackend {
    /// Create a new mock backend with the given responses.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            models: ["mock-model".to_string()].into_iter().collect(),
            responses: parking_lot::Mutex::new(responses.into()),
            fallback: None,
            request_log: parking_lot::Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Create a mock backend with text responses.
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(MockResponse::text).collect())
    }

    /// Reply with `response` once the script is exhausted.
    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Wait `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the set of installed models.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.request_log.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().len()
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl LlmBackend for MockBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let model = request.model.clone();
        self.request_log.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().pop_front();
        match next.or_else(|| self.fallback.clone()) {
            Some(MockResponse::Text(text)) => Ok(GenerateResponse::new(model, text)),
            Some(MockResponse::ModelNotFound) => Err(LlmError::model_not_found(model, "mock")),
            Some(MockResponse::Unreachable) => {
                Err(LlmError::Network("MockBackend: connection refused".to_string()))
            }
            None => Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            )),
        }
    }

    async fn list_models(&self) -> Result<BTreeSet<String>> {
        Ok(self.models.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_mock_backend_in_order() {
        let backend = MockBackend::with_texts(["First", "Second"]);

        let r1 = backend
            .generate(GenerateRequest::new("m", "1", 0.2))
            .await
            .unwrap();
        let r2 = backend
            .generate(GenerateRequest::new("m", "2", 0.7))
            .await
            .unwrap();

        assert_eq!(r1.text, "First");
        assert_eq!(r2.text, "Second");
        assert_eq!(backend.request_count(), 2);
        assert_eq!(backend.requests()[1].temperature, 0.7);
    }

    #[tokio::test]
    async fn test_mock_backend_exhausted() {
        let backend = MockBackend::new(vec![]);
        let result = backend.generate(GenerateRequest::new("m", "p", 0.2)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_backend_fallback() {
        let backend = MockBackend::with_texts(["once"]).with_fallback(MockResponse::text("again"));
        for expected in ["once", "again", "again"] {
            let r = backend
                .generate(GenerateRequest::new("m", "p", 0.2))
                .await
                .unwrap();
            assert_eq!(r.text, expected);
        }
    }

    #[tokio::test]
    async fn test_mock_backend_model_not_found() {
        let backend = MockBackend::new(vec![MockResponse::ModelNotFound]);
        let err = backend
            .generate(GenerateRequest::new("ghost:7b", "p", 0.2))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound { ref model, .. } if model == "ghost:7b"));
    }

    #[tokio::test]
    async fn test_mock_backend_models() {
        let backend = MockBackend::new(vec![]).with_models(["a:1b", "b:2b"]);
        let models = backend.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert!(backend.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_with_retry_retries_network_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry(3, Duration::from_millis(1), "test", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LlmError::Network("refused".to_string()))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(2, Duration::from_millis(1), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Network("refused".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_skips_non_retryable() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(5, Duration::from_millis(1), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::model_not_found("m", "test"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
