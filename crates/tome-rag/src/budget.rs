//! Budgeted article content for the synthesis prompt.

use futures::stream::{self, StreamExt};
use std::time::Duration;

use tome_index::SharedIndex;

use crate::calls::index_call;
use crate::complexity::ComplexityTier;
use crate::error::Result;
use crate::types::{ArticleContent, Candidate};

/// Fetches selected articles within a tier's paragraph and character budget.
#[derive(Clone)]
pub struct ContentBudgeter {
    index: SharedIndex,
    concurrency: usize,
    call_timeout: Duration,
}

impl ContentBudgeter {
    pub fn new(index: SharedIndex, concurrency: usize, call_timeout: Duration) -> Self {
        Self {
            index,
            concurrency: concurrency.max(1),
            call_timeout,
        }
    }

    /// Fetch content for `selected`, keeping selection order.
    ///
    /// Articles that come back empty are dropped. A network failure aborts;
    /// any other per-article failure counts as empty.
    pub async fn fetch(
        &self,
        selected: &[&Candidate],
        tier: &ComplexityTier,
    ) -> Result<Vec<ArticleContent>> {
        let fetched: Vec<tome_index::Result<Vec<String>>> = stream::iter(selected.iter())
            .map(|candidate| {
                index_call(
                    self.call_timeout,
                    "content fetch",
                    self.index.get_content(
                        &candidate.raw_title,
                        tier.paragraphs_per_article,
                        tier.char_budget_per_article,
                    ),
                )
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut articles = Vec::with_capacity(selected.len());
        for (candidate, result) in selected.iter().zip(fetched) {
            let paragraphs = match result {
                Ok(paragraphs) => paragraphs,
                Err(e) if e.is_retryable() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(title = %candidate.raw_title, error = %e, "Article fetch failed");
                    Vec::new()
                }
            };
            if paragraphs.is_empty() {
                tracing::debug!(title = %candidate.raw_title, "Dropping empty article");
                continue;
            }
            articles.push(ArticleContent {
                title: candidate.raw_title.clone(),
                paragraphs,
                url: candidate.url.clone(),
            });
        }

        tracing::info!(
            selected = selected.len(),
            kept = articles.len(),
            paragraphs = tier.paragraphs_per_article,
            chars = tier.char_budget_per_article,
            "Fetched article content"
        );
        Ok(articles)
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

    fn tier(paragraphs: usize, chars: usize) -> ComplexityTier {
        ComplexityTier {
            target_count: 3,
            paragraphs_per_article: paragraphs,
            char_budget_per_article: chars,
        }
    }

    #[tokio::test]
    async fn test_budget_applied_and_order_kept() {
        let index = Arc::new(
            MockIndex::new()
                .with_article("Chloroplast", ["Organelle.", "Has thylakoids.", "Green."])
                .with_article("Photosynthesis", ["Light to sugar.", "Two stages."]),
        );
        let budgeter = ContentBudgeter::new(index, 4, Duration::from_secs(5));

        let selected = [candidate("Chloroplast"), candidate("Photosynthesis")];
        let refs: Vec<&Candidate> = selected.iter().collect();
        let articles = budgeter.fetch(&refs, &tier(2, 1000)).await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Chloroplast");
        assert_eq!(articles[0].paragraphs, vec!["Organelle.", "Has thylakoids."]);
        assert_eq!(articles[1].url, "mock://wiki/Photosynthesis");
        for article in &articles {
            let chars: usize = article.paragraphs.iter().map(|p| p.chars().count()).sum();
            assert!(chars <= 1000);
        }
    }

    #[tokio::test]
    async fn test_empty_articles_dropped() {
        let index = Arc::new(MockIndex::new().with_article("Real", ["Content."]));
        let budgeter = ContentBudgeter::new(index, 2, Duration::from_secs(5));
        let selected = [candidate("Ghost"), candidate("Real")];
        let refs: Vec<&Candidate> = selected.iter().collect();
        let articles = budgeter.fetch(&refs, &tier(5, 500)).await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Real");
    }

    #[tokio::test]
    async fn test_unreachable_is_error() {
        let budgeter =
            ContentBudgeter::new(Arc::new(MockIndex::new().unreachable()), 2, Duration::from_secs(5));
        let selected = [candidate("Any")];
        let refs: Vec<&Candidate> = selected.iter().collect();
        assert!(budgeter.fetch(&refs, &tier(5, 500)).await.is_err());
    }
}
