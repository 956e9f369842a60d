//! Stage 1: pick the most relevant candidates with a small model.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use tome_config::SelectionSection;
use tome_llm::{GenerateRequest, ModelRole, SharedBackend};

use crate::calls::generate;
use crate::error::Result;
use crate::focus::QueryFocus;
use crate::prompt::selection_prompt;
use crate::types::{Candidate, SelectionMode, SelectionResult};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid number regex"));

/// What the selection model said, read as 1-based numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResponse {
    /// In-range picks as 0-based indices, first occurrence order. May be
    /// empty when every number was out of range.
    Parsed(Vec<usize>),
    /// The output contained no numbers at all.
    Unparseable,
}

/// Read the model's numbers against a list of `listed` candidates.
pub fn parse_selection(text: &str, listed: usize) -> SelectionResponse {
    let numbers: Vec<&str> = NUMBER.find_iter(text).map(|m| m.as_str()).collect();
    if numbers.is_empty() {
        return SelectionResponse::Unparseable;
    }

    let mut seen = HashSet::new();
    let indices = numbers
        .into_iter()
        .filter_map(|n| n.parse::<usize>().ok())
        .filter(|&n| (1..=listed).contains(&n))
        .map(|n| n - 1)
        .filter(|&i| seen.insert(i))
        .collect();
    SelectionResponse::Parsed(indices)
}

/// Sampling settings for Stage 1.
#[derive(Debug, Clone)]
pub struct SelectionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    /// Candidates shown to the model at most.
    pub max_listed: usize,
    pub call_timeout: Duration,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self::new(&SelectionSection::default(), Duration::from_secs(600))
    }
}

impl SelectionSettings {
    pub fn new(section: &SelectionSection, call_timeout: Duration) -> Self {
        Self {
            temperature: section.temperature as f32,
            max_tokens: section.max_tokens,
            top_p: section.top_p as f32,
            max_listed: section.max_listed.max(1),
            call_timeout,
        }
    }
}

/// Asks the selection model which candidates answer the question.
#[derive(Clone)]
pub struct RelevanceSelector {
    llm: SharedBackend,
    model: String,
    settings: SelectionSettings,
}

impl RelevanceSelector {
    pub fn new(llm: SharedBackend, model: impl Into<String>, settings: SelectionSettings) -> Self {
        Self {
            llm,
            model: model.into(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Choose up to `target_count` candidates.
    ///
    /// Output without usable picks falls back to the first `target_count`
    /// candidates in retrieval order. A failed generation call is an error.
    pub async fn select(
        &self,
        question: &str,
        candidates: &[Candidate],
        target_count: usize,
        focus: &QueryFocus,
    ) -> Result<SelectionResult> {
        let target_count = target_count.max(1);
        if candidates.is_empty() {
            return Ok(SelectionResult {
                indices: Vec::new(),
                mode: SelectionMode::Model,
            });
        }

        let listed = &candidates[..candidates.len().min(self.settings.max_listed)];
        let prompt = selection_prompt(question, listed, target_count, focus);
        let request = GenerateRequest::new(&self.model, prompt, self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_top_p(self.settings.top_p);

        let response = generate(
            &self.llm,
            request,
            self.settings.call_timeout,
            ModelRole::Selection,
        )
        .await?;

        let result = match parse_selection(&response.text, listed.len()) {
            SelectionResponse::Parsed(mut indices) if !indices.is_empty() => {
                indices.truncate(target_count);
                SelectionResult {
                    indices,
                    mode: SelectionMode::Model,
                }
            }
            parsed => {
                tracing::warn!(
                    model = %self.model,
                    output = %response.text.trim(),
                    unparseable = matches!(parsed, SelectionResponse::Unparseable),
                    "Selection output unusable, taking top candidates"
                );
                SelectionResult {
                    indices: (0..candidates.len().min(target_count)).collect(),
                    mode: SelectionMode::Fallback,
                }
            }
        };

        tracing::info!(
            model = %self.model,
            listed = listed.len(),
            selected = result.indices.len(),
            mode = %result.mode,
            "Selected articles"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for RelevanceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceSelector")
            .field("backend", &self.llm.name())
            .field("model", &self.model)
            .field("settings", &self.settings)
            .finish()
    }
}
