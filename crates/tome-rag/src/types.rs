//! Per-question pipeline data.
//!
//! Everything here is created fresh for one question and dropped once the
//! outcome is returned.

use std::time::Duration;

use serde::Serialize;
use tome_index::{SearchHit, normalize_title};

use crate::complexity::ComplexityTier;

/// A query term sent to the content index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTerm {
    pub text: String,
    /// This term is also probed as an exact article title.
    pub direct_lookup: bool,
}

impl SearchTerm {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direct_lookup: false,
        }
    }

    pub fn direct(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            direct_lookup: true,
        }
    }
}

/// An article found by search, before relevance filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Normalized title, unique within a retrieval result.
    pub title: String,
    /// Title as the index reports it.
    pub raw_title: String,
    /// Opening excerpt, once fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_excerpt: Option<String>,
    pub url: String,
    /// Found by exact-title probe; keeps its leading place when ranked.
    #[serde(skip)]
    pub pinned: bool,
}

impl Candidate {
    /// Candidate from an exact-title probe hit.
    pub fn pinned(hit: SearchHit) -> Self {
        Self {
            pinned: true,
            ..Self::from(hit)
        }
    }
}

impl From<SearchHit> for Candidate {
    fn from(hit: SearchHit) -> Self {
        Self {
            title: normalize_title(&hit.title),
            raw_title: hit.title,
            lead_excerpt: None,
            url: hit.url,
            pinned: false,
        }
    }
}

/// Where a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// The selection model's answer was used.
    Model,
    /// The model's answer was unusable; the first candidates were taken.
    Fallback,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::Model => write!(f, "model"),
            SelectionMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// Candidates chosen by Stage 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    /// Indices into the candidate list, in selection order.
    pub indices: Vec<usize>,
    pub mode: SelectionMode,
}

/// Budgeted content of one selected article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: String,
    pub paragraphs: Vec<String>,
    pub url: String,
}

impl ArticleContent {
    /// Paragraphs joined for a prompt.
    pub fn text(&self) -> String {
        self.paragraphs.join("\n\n")
    }
}

/// Raw Stage 2 output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub answer_text: String,
    /// Marker numbers in order of appearance.
    pub citation_markers: Vec<u32>,
}

/// A cited source, numbered as in the answer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub index: u32,
    pub title: String,
    pub url: String,
}

/// A synthesized answer.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer_text: String,
    /// Cited sources, ascending by index.
    pub sources: Vec<Source>,
    /// Markers that pointed past the supplied sources.
    pub unresolved_citations: Vec<u32>,
    /// Synthesis model.
    pub model: String,
    pub selection_model: String,
    pub tier: ComplexityTier,
    pub selection_mode: SelectionMode,
    pub elapsed: Duration,
}

/// Why no answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoInformationReason {
    /// Search found no candidate articles.
    NoCandidates,
    /// Every selected article came back empty.
    EmptyContent,
}

impl std::fmt::Display for NoInformationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "No relevant articles found in the local index."),
            Self::EmptyContent => write!(f, "Could not retrieve article content."),
        }
    }
}

/// Result of answering one question.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Answered(Answer),
    NoInformation {
        question: String,
        reason: NoInformationReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl Outcome {
    /// The question this outcome answers.
    pub fn question(&self) -> &str {
        match self {
            Outcome::Answered(answer) => &answer.question,
            Outcome::NoInformation { question, .. } => question,
        }
    }

    /// The answer, if one was produced.
    pub fn answer(&self) -> Option<&Answer> {
        match self {
            Outcome::Answered(answer) => Some(answer),
            Outcome::NoInformation { .. } => None,
        }
    }
}
