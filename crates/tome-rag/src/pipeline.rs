//! Orchestration of one question from text to cited answer.

use futures::stream::{self, StreamExt};
use std::time::{Duration, Instant};

use tome_config::TomeConfig;
use tome_index::SharedIndex;
use tome_llm::SharedBackend;

use crate::abstracts::AbstractFetcher;
use crate::budget::ContentBudgeter;
use crate::citation::map_citations;
use crate::complexity::ComplexityEstimator;
use crate::error::{PipelineError, Result};
use crate::focus::QueryFocus;
use crate::ranking::CandidateRanker;
use crate::retrieval::{CandidateRetriever, RetrievalSettings};
use crate::selection::{RelevanceSelector, SelectionSettings};
use crate::synthesis::{AnswerSynthesizer, SynthesisSettings};
use crate::terms::SearchTermExtractor;
use crate::types::{Answer, Candidate, NoInformationReason, Outcome};

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// The two-stage question answering pipeline.
///
/// Holds only shared service handles and settings, so one pipeline serves
/// any number of questions, concurrently in batch mode.
#[derive(Clone)]
pub struct Pipeline {
    estimator: ComplexityEstimator,
    extractor: SearchTermExtractor,
    retriever: CandidateRetriever,
    abstracts: AbstractFetcher,
    ranker: CandidateRanker,
    selector: RelevanceSelector,
    budgeter: ContentBudgeter,
    synthesizer: AnswerSynthesizer,
    strict_citations: bool,
    question_timeout: Option<Duration>,
    batch_concurrency: usize,
}

impl Pipeline {
    /// Create a builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Model used for Stage 1.
    pub fn selection_model(&self) -> &str {
        self.selector.model()
    }

    /// Model used for Stage 2.
    pub fn synthesis_model(&self) -> &str {
        self.synthesizer.model()
    }

    pub fn estimator(&self) -> &ComplexityEstimator {
        &self.estimator
    }

    /// Answer one question with the estimated tier.
    pub async fn answer(&self, question: &str) -> Result<Outcome> {
        self.answer_with(question, None).await
    }

    /// Answer one question, optionally forcing the number of articles read.
    pub async fn answer_with(&self, question: &str, max_results: Option<usize>) -> Result<Outcome> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidQuestion(
                "question is empty".to_string(),
            ));
        }

        match self.question_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(question, max_results))
                .await
                .map_err(|_| PipelineError::Timeout {
                    secs: limit.as_secs(),
                })?,
            None => self.run(question, max_results).await,
        }
    }

    /// Answer several questions concurrently. Results keep input order.
    pub async fn answer_batch<S: AsRef<str>>(&self, questions: &[S]) -> Vec<Result<Outcome>> {
        stream::iter(questions)
            .map(|q| self.answer(q.as_ref()))
            .buffered(self.batch_concurrency)
            .collect()
            .await
    }

    async fn run(&self, question: &str, max_results: Option<usize>) -> Result<Outcome> {
        let started = Instant::now();
        tracing::info!(question, "Answering question");

        let tier = match max_results {
            Some(count) => self.estimator.tier_for_count(count),
            None => self.estimator.estimate(question),
        };
        let terms = self.extractor.extract(question);
        let focus = QueryFocus::from_question(question, &terms);

        let mut candidates = self.retriever.retrieve(&terms, tier.target_count).await?;
        if candidates.is_empty() {
            tracing::info!(question, "No candidate articles");
            return Ok(Outcome::NoInformation {
                question: question.to_string(),
                reason: NoInformationReason::NoCandidates,
                hint: None,
            });
        }

        self.abstracts.fetch(&mut candidates).await;
        self.ranker.rank(&mut candidates, &focus);

        let stage_one = Instant::now();
        let selection = self
            .selector
            .select(question, &candidates, tier.target_count, &focus)
            .await?;
        tracing::debug!(
            elapsed_ms = stage_one.elapsed().as_millis() as u64,
            "Stage 1 complete"
        );

        let selected: Vec<&Candidate> = selection
            .indices
            .iter()
            .filter_map(|&i| candidates.get(i))
            .collect();
        let articles = self.budgeter.fetch(&selected, &tier).await?;
        if articles.is_empty() {
            return Ok(Outcome::NoInformation {
                question: question.to_string(),
                reason: NoInformationReason::EmptyContent,
                hint: Some(empty_content_hint(question)),
            });
        }

        let stage_two = Instant::now();
        let synthesis = self.synthesizer.synthesize(question, &articles).await?;
        tracing::debug!(
            elapsed_ms = stage_two.elapsed().as_millis() as u64,
            "Stage 2 complete"
        );

        let citations = map_citations(&synthesis.citation_markers, &articles);
        if self.strict_citations && !citations.unresolved.is_empty() {
            return Err(PipelineError::Citation {
                unresolved: citations.unresolved,
                available: articles.len(),
            });
        }

        let elapsed = started.elapsed();
        tracing::info!(
            tier = tier.target_count,
            candidates = candidates.len(),
            articles = articles.len(),
            sources = citations.sources.len(),
            selection_mode = %selection.mode,
            elapsed_ms = elapsed.as_millis() as u64,
            "Question answered"
        );

        Ok(Outcome::Answered(Answer {
            question: question.to_string(),
            answer_text: synthesis.answer_text,
            sources: citations.sources,
            unresolved_citations: citations.unresolved,
            model: self.synthesizer.model().to_string(),
            selection_model: self.selector.model().to_string(),
            tier,
            selection_mode: selection.mode,
            elapsed,
        }))
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("estimator", &self.estimator)
            .field("retriever", &self.retriever)
            .field("ranker", &self.ranker)
            .field("selector", &self.selector)
            .field("synthesizer", &self.synthesizer)
            .field("strict_citations", &self.strict_citations)
            .field("question_timeout", &self.question_timeout)
            .field("batch_concurrency", &self.batch_concurrency)
            .finish_non_exhaustive()
    }
}

/// Abbreviations: words of 2 to 5 characters with no lowercase letters.
fn abbreviations(question: &str) -> Vec<&str> {
    question
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| {
            (2..=5).contains(&w.chars().count())
                && w.chars().any(char::is_uppercase)
                && !w.chars().any(char::is_lowercase)
        })
        .collect()
}

/// Suggestion shown when every selected article came back empty.
fn empty_content_hint(question: &str) -> String {
    let found = abbreviations(question);
    if found.is_empty() {
        return "Try rephrasing your question or using different search terms.".to_string();
    }
    let listed = found
        .iter()
        .take(3)
        .map(|a| format!("'{a}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Your question contains abbreviation(s): {listed}. Try spelling out the full term \
         (e.g., 'What is an exchange-traded fund?' instead of 'What is an ETF?')."
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    index: Option<SharedIndex>,
    backend: Option<SharedBackend>,
    selection_model: Option<String>,
    synthesis_model: Option<String>,
    config: TomeConfig,
}

impl PipelineBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content index.
    pub fn with_index(mut self, index: SharedIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the generation backend used by both stages.
    pub fn with_backend(mut self, backend: SharedBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the resolved Stage 1 and Stage 2 models.
    pub fn with_models(mut self, selection: impl Into<String>, synthesis: impl Into<String>) -> Self {
        self.selection_model = Some(selection.into());
        self.synthesis_model = Some(synthesis.into());
        self
    }

    /// Set the configuration. Missing sections use defaults.
    pub fn with_config(mut self, config: TomeConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and assemble the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        self.config.validate()?;

        let index = self
            .index
            .ok_or_else(|| PipelineError::config("no content index configured"))?;
        let backend = self
            .backend
            .ok_or_else(|| PipelineError::config("no generation backend configured"))?;
        let selection_model = self
            .selection_model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| PipelineError::config("no selection model resolved"))?;
        let synthesis_model = self
            .synthesis_model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| PipelineError::config("no synthesis model resolved"))?;

        let pipeline = self.config.pipeline();
        let retrieval = self.config.retrieval();
        let fetch_timeout = Duration::from_secs(pipeline.fetch_timeout_secs);
        let generate_timeout = Duration::from_secs(pipeline.generate_timeout_secs);

        Ok(Pipeline {
            estimator: ComplexityEstimator::new(&self.config.complexity()),
            extractor: SearchTermExtractor::new(retrieval.max_terms),
            retriever: CandidateRetriever::new(
                index.clone(),
                RetrievalSettings::new(&retrieval, &pipeline),
            ),
            abstracts: AbstractFetcher::new(
                index.clone(),
                self.config.abstracts().max_chars,
                pipeline.fetch_concurrency,
                fetch_timeout,
            ),
            ranker: CandidateRanker::new(&retrieval),
            selector: RelevanceSelector::new(
                backend.clone(),
                selection_model,
                SelectionSettings::new(&self.config.selection(), generate_timeout),
            ),
            budgeter: ContentBudgeter::new(index, pipeline.fetch_concurrency, fetch_timeout),
            synthesizer: AnswerSynthesizer::new(
                backend,
                synthesis_model,
                SynthesisSettings::new(&self.config.synthesis(), generate_timeout),
            ),
            strict_citations: self.config.citations().strict,
            question_timeout: pipeline.question_timeout_secs.map(Duration::from_secs),
            batch_concurrency: pipeline.batch_concurrency.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tome_config::{ComplexitySection, TierSpec};
    use tome_index::MockIndex;
    use tome_llm::MockBackend;

    fn builder() -> PipelineBuilder {
        Pipeline::builder()
            .with_index(Arc::new(MockIndex::new()))
            .with_backend(Arc::new(MockBackend::new(vec![])))
            .with_models("small", "large")
    }

    #[test]
    fn test_build_requires_services_and_models() {
        assert!(builder().build().is_ok());

        let err = Pipeline::builder()
            .with_backend(Arc::new(MockBackend::new(vec![])))
            .with_models("a", "b")
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let err = builder().with_models("", "large").build().unwrap_err();
        assert!(err.to_string().contains("selection model"));
    }

    #[test]
    fn test_debug_names_stages() {
        let pipeline = builder().build().unwrap();
        let debug = format!("{pipeline:?}");
        assert!(debug.starts_with("Pipeline {"));
        assert!(debug.contains("ranker"));
        assert!(debug.contains("strict_citations: false"));
    }

    #[test]
    fn test_build_rejects_invalid_tiers() {
        let mut complexity = ComplexitySection::default();
        complexity.tiers = vec![TierSpec::new(0, 3, 20, 8000), TierSpec::new(2, 2, 20, 8000)];
        let config = TomeConfig {
            complexity: Some(complexity),
            ..TomeConfig::new()
        };
        let err = builder().with_config(config).build().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let pipeline = builder().build().unwrap();
        let err = pipeline.answer("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidQuestion(_)));
    }

    #[test]
    fn test_abbreviation_hint() {
        assert_eq!(abbreviations("What is an ETF?"), vec!["ETF"]);
        assert!(abbreviations("What is a exchange?").is_empty());
        assert!(abbreviations("Is NASA or A big?").contains(&"NASA"));
        assert!(empty_content_hint("What is an ETF?").contains("'ETF'"));
        assert!(empty_content_hint("What is xyzzy?").starts_with("Try rephrasing"));
    }

    #[test]
    fn test_accessors() {
        let pipeline = builder().build().unwrap();
        assert_eq!(pipeline.selection_model(), "small");
        assert_eq!(pipeline.synthesis_model(), "large");
        assert_eq!(pipeline.estimator().estimate("What is photosynthesis?").target_count, 3);
    }
}
