//! Content index trait and shared retry logic.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::types::SearchHit;

// ─────────────────────────────────────────────────────────────────────────────
// Shared Retry Logic
// ─────────────────────────────────────────────────────────────────────────────

/// Execute an async index operation with exponential backoff retry.
///
/// Only network failures are retried.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    initial_backoff: Duration,
    index_name: &str,
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
            Err(e) if !e.is_retryable() || attempt >= max_retries => return Err(e),
            Err(e) => {
                attempt += 1;
                tracing::warn!(
                    index = index_name,
                    attempt = attempt,
                    max_retries = max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Index request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content Index Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A searchable store of encyclopedia articles.
///
/// A missing article is never an error: `lookup` returns `None`, `get_lead`
/// and `get_content` return empty results. Errors mean the index itself is
/// unusable (unreachable, malformed responses).
#[async_trait]
pub trait ContentIndex: Send + Sync {
    /// Full-text search, returning at most `limit` hits in rank order.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Check whether an article with exactly this title exists.
    async fn lookup(&self, title: &str) -> Result<Option<SearchHit>>;

    /// Opening excerpt of an article, at most `max_chars` characters.
    async fn get_lead(&self, title: &str, max_chars: usize) -> Result<String>;

    /// Budgeted body paragraphs of an article.
    async fn get_content(
        &self,
        title: &str,
        max_paragraphs: usize,
        max_chars: usize,
    ) -> Result<Vec<String>>;

    /// Name of this index, for logs.
    fn name(&self) -> &str;

    /// Check if the index is reachable.
    async fn health_check(&self) -> Result<()> {
        self.search("test", 1).await.map(|_| ())
    }
}

/// An index that can be shared across tasks.
pub type SharedIndex = Arc<dyn ContentIndex>;
