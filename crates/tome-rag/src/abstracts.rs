//! Lead excerpts for candidates, fetched concurrently.

use futures::stream::{self, StreamExt};
use std::time::Duration;

use tome_index::SharedIndex;

use crate::calls::index_call;
use crate::types::Candidate;

/// Fills [`Candidate::lead_excerpt`].
#[derive(Clone)]
pub struct AbstractFetcher {
    index: SharedIndex,
    max_chars: usize,
    concurrency: usize,
    call_timeout: Duration,
}

impl AbstractFetcher {
    pub fn new(index: SharedIndex, max_chars: usize, concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            index,
            max_chars,
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Fetch an excerpt for every candidate, keeping their order.
    ///
    /// A failed or empty fetch leaves the excerpt unset.
    pub async fn fetch(&self, candidates: &mut [Candidate]) {
        let leads: Vec<Option<String>> = stream::iter(candidates.iter())
            .map(|candidate| async move {
                let title = candidate.raw_title.as_str();
                match index_call(
                    self.call_timeout,
                    "lead fetch",
                    self.index.get_lead(title, self.max_chars),
                )
                .await
                {
                    Ok(lead) if !lead.is_empty() => Some(lead),
                    Ok(_) => None,
                    Err(e) => {
                        tracing::warn!(title, error = %e, "Lead excerpt unavailable");
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let fetched = leads.iter().filter(|l| l.is_some()).count();
        for (candidate, lead) in candidates.iter_mut().zip(leads) {
            candidate.lead_excerpt = lead;
        }
        tracing::debug!(candidates = candidates.len(), fetched, "Fetched lead excerpts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tome_index::{MockIndex, SearchHit};

    fn candidate(title: &str) -> Candidate {
        Candidate::from(SearchHit::new(title, format!("mock://wiki/{title}")))
    }

    #[tokio::test]
    async fn test_excerpts_in_order_with_failures_unset() {
        let index = Arc::new(
            MockIndex::new()
                .with_article("Photosynthesis", ["Plants convert light into chemical energy."])
                .with_article("Chlorophyll", ["A green pigment."])
                .with_failing_lead("Chlorophyll"),
        );
        let fetcher = AbstractFetcher::new(index, 300, 4, Duration::from_secs(5));

        let mut candidates = vec![
            candidate("Photosynthesis"),
            candidate("Chlorophyll"),
            candidate("Missing"),
        ];
        fetcher.fetch(&mut candidates).await;

        assert_eq!(
            candidates[0].lead_excerpt.as_deref(),
            Some("Plants convert light into chemical energy.")
        );
        assert!(candidates[1].lead_excerpt.is_none());
        assert!(candidates[2].lead_excerpt.is_none());
    }

    #[tokio::test]
    async fn test_excerpt_truncated() {
        let index = Arc::new(MockIndex::new().with_article("Long", ["word ".repeat(200)]));
        let fetcher = AbstractFetcher::new(index, 50, 1, Duration::from_secs(5));
        let mut candidates = vec![candidate("Long")];
        fetcher.fetch(&mut candidates).await;
        let lead = candidates[0].lead_excerpt.as_deref().unwrap();
        assert_eq!(lead.chars().count(), 50);
    }
}
