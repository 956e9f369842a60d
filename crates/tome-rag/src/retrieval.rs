//! Candidate retrieval: overfetched term searches plus exact-title probes.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Duration;

use tome_config::{PipelineSection, RetrievalSection};
use tome_index::{SearchHit, SharedIndex};

use crate::calls::index_call;
use crate::error::{PipelineError, Result};
use crate::types::{Candidate, SearchTerm};

/// Retrieval settings.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    /// Per-term result count as a multiple of the target count.
    pub overfetch: usize,
    /// Ceiling on merged candidates.
    pub max_candidates: usize,
    pub media_suffixes: Vec<String>,
    pub media_probe_terms: usize,
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self::new(&RetrievalSection::default(), &PipelineSection::default())
    }
}

impl RetrievalSettings {
    pub fn new(retrieval: &RetrievalSection, pipeline: &PipelineSection) -> Self {
        Self {
            overfetch: retrieval.overfetch.max(1),
            max_candidates: retrieval.max_candidates.max(1),
            media_suffixes: retrieval.media_suffixes.clone(),
            media_probe_terms: retrieval.media_probe_terms,
            concurrency: pipeline.search_concurrency.max(1),
            call_timeout: Duration::from_secs(pipeline.search_timeout_secs),
        }
    }
}

/// Searches the index for each term and merges the results.
#[derive(Clone)]
pub struct CandidateRetriever {
    index: SharedIndex,
    settings: RetrievalSettings,
}

impl CandidateRetriever {
    pub fn new(index: SharedIndex, settings: RetrievalSettings) -> Self {
        Self { index, settings }
    }

    /// Retrieve deduplicated candidates for `terms`.
    ///
    /// An exact-title hit for the direct-lookup term comes first, then media
    /// title hits, then search results in term order. Those leading hits are
    /// marked pinned. Only an unusable index is an error; a term with no hits
    /// or a failed search contributes nothing.
    pub async fn retrieve(
        &self,
        terms: &[SearchTerm],
        target_count: usize,
    ) -> Result<Vec<Candidate>> {
        let mut pinned: Vec<SearchHit> = Vec::new();
        if let Some(direct) = terms.iter().find(|t| t.direct_lookup)
            && let Some(hit) = self.probe(&direct.text).await?
        {
            pinned.push(hit);
        }
        pinned.extend(self.media_probes(terms).await?);

        let limit = self.settings.overfetch * target_count.max(1);
        let searches: Vec<tome_index::Result<Vec<SearchHit>>> = stream::iter(terms)
            .map(|term| {
                index_call(
                    self.settings.call_timeout,
                    "search",
                    self.index.search(&term.text, limit),
                )
            })
            .buffered(self.settings.concurrency)
            .collect()
            .await;

        let mut hits = Vec::new();
        for (term, result) in terms.iter().zip(searches) {
            match result {
                Ok(found) => {
                    tracing::debug!(term = %term.text, hits = found.len(), "Searched term");
                    hits.extend(found);
                }
                Err(e) if e.is_retryable() => return Err(e.into()),
                Err(e) => tracing::warn!(term = %term.text, error = %e, "Search failed"),
            }
        }

        let pinned_hits = pinned.len();
        let mut seen = HashSet::new();
        let candidates: Vec<Candidate> = pinned
            .into_iter()
            .map(Candidate::pinned)
            .chain(hits.into_iter().map(Candidate::from))
            .filter(|c| seen.insert(c.title.clone()))
            .take(self.settings.max_candidates)
            .collect();

        tracing::info!(
            terms = terms.len(),
            pinned = pinned_hits,
            candidates = candidates.len(),
            "Retrieved candidates"
        );
        Ok(candidates)
    }

    /// Exact-title probe. Only network failures propagate.
    async fn probe(&self, title: &str) -> Result<Option<SearchHit>> {
        match index_call(self.settings.call_timeout, "lookup", self.index.lookup(title)).await {
            Ok(hit) => Ok(hit),
            Err(e) if e.is_retryable() => Err(e.into()),
            Err(e) => {
                tracing::warn!(title, error = %e, "Title probe failed");
                Ok(None)
            }
        }
    }

    /// First existing `"<term><suffix>"` title for each of the leading terms.
    async fn media_probes(&self, terms: &[SearchTerm]) -> Result<Vec<SearchHit>> {
        if self.settings.media_suffixes.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<Result<Option<SearchHit>>> =
            stream::iter(terms.iter().take(self.settings.media_probe_terms))
                .map(|term| async move {
                    for suffix in &self.settings.media_suffixes {
                        if let Some(hit) = self.probe(&format!("{}{}", term.text, suffix)).await? {
                            return Ok(Some(hit));
                        }
                    }
                    Ok::<_, PipelineError>(None)
                })
                .buffered(self.settings.concurrency)
                .collect()
                .await;

        found
            .into_iter()
            .filter_map(|r| r.transpose())
            .collect::<Result<Vec<_>>>()
    }
}

impl std::fmt::Debug for CandidateRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateRetriever")
            .field("index", &self.index.name())
            .field("settings", &self.settings)
            .finish()
    }
}
