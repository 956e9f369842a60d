//! Adaptive two-stage retrieval and synthesis over an offline encyclopedia.
//!
//! A question is scored for complexity, which fixes how many articles to
//! read and how much of each. Search terms shaped like article titles are
//! extracted and searched, the merged candidates get lead excerpts and are
//! ranked, and a small model picks the relevant ones (Stage 1). Their
//! budgeted content goes to a larger model that writes an answer with inline
//! `[n]` citations (Stage 2), which are finally mapped back to article titles
//! and URLs.
//!
//! ```text
//!  question
//!     │
//!     ├─▶ ComplexityEstimator ──▶ tier (articles, paragraphs, chars)
//!     ├─▶ SearchTermExtractor ──▶ terms + QueryFocus
//!     ▼
//!  CandidateRetriever ──▶ AbstractFetcher ──▶ CandidateRanker
//!                                                    │
//!                                                    ▼
//!  ContentBudgeter ◀──────────────── RelevanceSelector (Stage 1)
//!     │
//!     ▼
//!  AnswerSynthesizer (Stage 2) ──▶ CitationMapper
//!                                        │
//!                                        ▼
//!  Outcome::Answered | Outcome::NoInformation
//! ```
//!
//! Only the [`Pipeline`] holds state, and that state is limited to shared
//! service handles and settings.

pub mod abstracts;
pub mod budget;
mod calls;
pub mod citation;
pub mod complexity;
pub mod error;
pub mod focus;
pub mod pipeline;
pub mod prompt;
pub mod ranking;
pub mod retrieval;
pub mod selection;
pub mod synthesis;
pub mod terms;
pub mod types;

pub use abstracts::AbstractFetcher;
pub use budget::ContentBudgeter;
pub use citation::{CitationMap, extract_markers, map_citations};
pub use complexity::{ComplexityEstimator, ComplexityTier};
pub use error::{PipelineError, Result};
pub use focus::QueryFocus;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use ranking::CandidateRanker;
pub use retrieval::{CandidateRetriever, RetrievalSettings};
pub use selection::{RelevanceSelector, SelectionResponse, SelectionSettings, parse_selection};
pub use synthesis::{AnswerSynthesizer, SynthesisSettings};
pub use terms::SearchTermExtractor;
pub use types::{
    Answer, ArticleContent, Candidate, NoInformationReason, Outcome, SearchTerm, SelectionMode,
    SelectionResult, Source, SynthesisResult,
};
