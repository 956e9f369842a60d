//! In-memory content index for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::backend::ContentIndex;
use crate::error::{IndexError, Result};
use crate::html;
use crate::types::{SearchHit, normalize_title};

/// A recorded call against [`MockIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    Search { term: String, limit: usize },
    Lookup(String),
    Lead(String),
    Content(String),
}

#[derive(Debug, Clone)]
struct MockArticle {
    title: String,
    paragraphs: Vec<String>,
}

/// Scripted content index.
///
/// Articles are registered by title; searches return scripted hit lists by
/// exact term. Unscripted searches return nothing.
#[derive(Debug, Default)]
pub struct MockIndex {
    articles: HashMap<String, MockArticle>,
    searches: HashMap<String, Vec<String>>,
    unreachable: bool,
    failing_leads: Vec<String>,
    failing_searches: Vec<String>,
    calls: Mutex<Vec<IndexCall>>,
}

impl MockIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an article.
    pub fn with_article<I, S>(mut self, title: &str, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.articles.insert(
            normalize_title(title),
            MockArticle {
                title: title.to_string(),
                paragraphs: paragraphs.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Script the titles returned for a search term, in rank order.
    pub fn with_search<I, S>(mut self, term: &str, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searches
            .insert(term.to_string(), titles.into_iter().map(Into::into).collect());
        self
    }

    /// Make every call fail as if the service were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Make lead fetches for `title` fail.
    pub fn with_failing_lead(mut self, title: &str) -> Self {
        self.failing_leads.push(normalize_title(title));
        self
    }

    /// Make searches for `term` fail with a server error.
    pub fn with_failing_search(mut self, term: &str) -> Self {
        self.failing_searches.push(term.to_string());
        self
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().clone()
    }

    fn url(title: &str) -> String {
        format!("mock://wiki/{}", title.replace(' ', "_"))
    }

    fn check(&self, call: IndexCall) -> Result<()> {
        self.calls.lock().push(call);
        if self.unreachable {
            return Err(IndexError::Network("MockIndex: connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentIndex for MockIndex {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.check(IndexCall::Search {
            term: term.to_string(),
            limit,
        })?;
        if self.failing_searches.iter().any(|t| t == term) {
            return Err(IndexError::Http {
                status: 500,
                url: format!("mock://search?pattern={term}"),
            });
        }
        Ok(self
            .searches
            .get(term)
            .into_iter()
            .flatten()
            .take(limit)
            .map(|title| SearchHit::new(title.as_str(), Self::url(title)))
            .collect())
    }

    async fn lookup(&self, title: &str) -> Result<Option<SearchHit>> {
        self.check(IndexCall::Lookup(title.to_string()))?;
        Ok(self
            .articles
            .get(&normalize_title(title))
            .map(|a| SearchHit::new(a.title.as_str(), Self::url(&a.title))))
    }

    async fn get_lead(&self, title: &str, max_chars: usize) -> Result<String> {
        self.check(IndexCall::Lead(title.to_string()))?;
        let key = normalize_title(title);
        if self.failing_leads.contains(&key) {
            return Err(IndexError::Http {
                status: 500,
                url: Self::url(title),
            });
        }
        Ok(self
            .articles
            .get(&key)
            .map(|a| html::lead_excerpt(&a.paragraphs, 0, max_chars))
            .unwrap_or_default())
    }

    async fn get_content(
        &self,
        title: &str,
        max_paragraphs: usize,
        max_chars: usize,
    ) -> Result<Vec<String>> {
        self.check(IndexCall::Content(title.to_string()))?;
        Ok(self
            .articles
            .get(&normalize_title(title))
            .map(|a| html::budget_paragraphs(a.paragraphs.clone(), max_paragraphs, max_chars, 0))
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
