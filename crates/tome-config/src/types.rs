//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [kiwix]        # content index server
//! [ollama]       # text generation service
//! [models]       # model pins and preference lists
//! [retrieval]    # candidate search
//! [abstracts]    # lead excerpts for Stage 1
//! [selection]    # Stage 1 sampling
//! [synthesis]    # Stage 2 sampling
//! [complexity]   # question scoring and retrieval tiers
//! [citations]    # citation validation
//! [pipeline]     # timeouts and concurrency
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged. Accessors return the section or its
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kiwix: Option<KiwixSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abstracts: Option<AbstractsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<ComplexitySection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<CitationsSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineSection>,
}

impl TomeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section filled in with its defaults.
    pub fn with_defaults() -> Self {
        Self {
            kiwix: Some(KiwixSection::default()),
            ollama: Some(OllamaSection::default()),
            models: Some(ModelsSection::default()),
            retrieval: Some(RetrievalSection::default()),
            abstracts: Some(AbstractsSection::default()),
            selection: Some(SelectionSection::default()),
            synthesis: Some(SynthesisSection::default()),
            complexity: Some(ComplexitySection::default()),
            citations: Some(CitationsSection::default()),
            pipeline: Some(PipelineSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole; fields missing from a section in `other`
    /// take their defaults, not the values from `self`.
    pub fn merge(&mut self, other: TomeConfig) {
        if other.kiwix.is_some() {
            self.kiwix = other.kiwix;
        }
        if other.ollama.is_some() {
            self.ollama = other.ollama;
        }
        if other.models.is_some() {
            self.models = other.models;
        }
        if other.retrieval.is_some() {
            self.retrieval = other.retrieval;
        }
        if other.abstracts.is_some() {
            self.abstracts = other.abstracts;
        }
        if other.selection.is_some() {
            self.selection = other.selection;
        }
        if other.synthesis.is_some() {
            self.synthesis = other.synthesis;
        }
        if other.complexity.is_some() {
            self.complexity = other.complexity;
        }
        if other.citations.is_some() {
            self.citations = other.citations;
        }
        if other.pipeline.is_some() {
            self.pipeline = other.pipeline;
        }
    }

    pub fn kiwix(&self) -> KiwixSection {
        self.kiwix.clone().unwrap_or_default()
    }

    pub fn ollama(&self) -> OllamaSection {
        self.ollama.clone().unwrap_or_default()
    }

    pub fn models(&self) -> ModelsSection {
        self.models.clone().unwrap_or_default()
    }

    pub fn retrieval(&self) -> RetrievalSection {
        self.retrieval.clone().unwrap_or_default()
    }

    pub fn abstracts(&self) -> AbstractsSection {
        self.abstracts.clone().unwrap_or_default()
    }

    pub fn selection(&self) -> SelectionSection {
        self.selection.clone().unwrap_or_default()
    }

    pub fn synthesis(&self) -> SynthesisSection {
        self.synthesis.clone().unwrap_or_default()
    }

    pub fn complexity(&self) -> ComplexitySection {
        self.complexity.clone().unwrap_or_default()
    }

    pub fn citations(&self) -> CitationsSection {
        self.citations.clone().unwrap_or_default()
    }

    pub fn pipeline(&self) -> PipelineSection {
        self.pipeline.clone().unwrap_or_default()
    }

    /// Check the effective configuration for values the pipeline cannot use.
    pub fn validate(&self) -> Result<()> {
        self.complexity().validate()?;

        let retrieval = self.retrieval();
        if retrieval.overfetch == 0 {
            return Err(ConfigError::invalid("retrieval.overfetch", "must be at least 1"));
        }
        if retrieval.max_candidates == 0 {
            return Err(ConfigError::invalid(
                "retrieval.max_candidates",
                "must be at least 1",
            ));
        }
        if retrieval.max_terms == 0 {
            return Err(ConfigError::invalid("retrieval.max_terms", "must be at least 1"));
        }

        let pipeline = self.pipeline();
        for (field, value) in [
            ("pipeline.search_concurrency", pipeline.search_concurrency),
            ("pipeline.fetch_concurrency", pipeline.fetch_concurrency),
            ("pipeline.batch_concurrency", pipeline.batch_concurrency),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be at least 1"));
            }
        }

        for (field, value) in [
            ("selection.temperature", self.selection().temperature),
            ("synthesis.temperature", self.synthesis().temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::invalid(field, "must be between 0.0 and 2.0"));
            }
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Services
// ─────────────────────────────────────────────────────────────────────────────

/// Content index server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KiwixSection {
    /// Base URL of kiwix-serve; the port is also used when starting it.
    pub url: String,
    /// Book (ZIM name) articles are served under.
    pub book: String,
    /// Restrict searches to `book`.
    pub restrict_search: bool,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Retries for transient network errors.
    pub max_retries: u32,
    /// Start kiwix-serve when nothing answers at `url`.
    pub auto_start: bool,
    /// Explicit path to the kiwix-serve binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,
    /// Extra directories searched for `.zim` files.
    pub zim_dirs: Vec<PathBuf>,
    /// Article paragraphs shorter than this are skipped.
    pub min_paragraph_chars: usize,
}

impl Default for KiwixSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            book: "wikipedia_en_all_maxi_2024-01".to_string(),
            restrict_search: false,
            timeout_secs: 10,
            max_retries: 2,
            auto_start: true,
            binary: None,
            zim_dirs: Vec::new(),
            min_paragraph_chars: 50,
        }
    }
}

/// Text generation service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSection {
    pub url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for OllamaSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            timeout_secs: 600,
            max_retries: 2,
        }
    }
}

/// Model pins and preference overrides.
///
/// Unset preference lists fall back to the built-in lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    /// Stage 1 model, used as-is when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    /// Stage 2 model, used as-is when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection_preferences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis_preferences: Option<Vec<String>>,
    /// Name fragments never picked as a last-resort selection model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded: Option<Vec<String>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Retrieval
// ─────────────────────────────────────────────────────────────────────────────

/// Candidate search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSection {
    /// Results requested per term, as a multiple of the tier's target count.
    pub overfetch: usize,
    /// Ceiling on merged candidates.
    pub max_candidates: usize,
    /// Maximum search terms extracted from a question.
    pub max_terms: usize,
    /// Title suffixes probed for media articles.
    pub media_suffixes: Vec<String>,
    /// How many leading terms get media probes.
    pub media_probe_terms: usize,
    /// Rank unpinned candidates by topic match, page kind and abstract.
    pub prioritize_focus: bool,
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            overfetch: 3,
            max_candidates: 25,
            max_terms: 5,
            media_suffixes: [" (TV series)", " (film)", " (TV show)", " (television)"]
                .map(String::from)
                .to_vec(),
            media_probe_terms: 3,
            prioritize_focus: true,
        }
    }
}

/// Lead excerpt settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbstractsSection {
    pub max_chars: usize,
}

impl Default for AbstractsSection {
    fn default() -> Self {
        Self { max_chars: 300 }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Stage 1 sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    /// Candidates listed in the prompt at most.
    pub max_listed: usize,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 200,
            top_p: 0.9,
            max_listed: 30,
        }
    }
}

/// Stage 2 sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub repeat_penalty: f64,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1500,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Complexity
// ─────────────────────────────────────────────────────────────────────────────

/// A group of markers that adds `weight` once when any marker is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub name: String,
    pub weight: u32,
    pub markers: Vec<String>,
}

impl SignalGroup {
    fn new(name: &str, weight: u32, markers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            markers: markers.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One row of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Lowest score that reaches this tier.
    pub min_score: u32,
    pub articles: usize,
    pub paragraphs: usize,
    pub chars: usize,
}

impl TierSpec {
    pub const fn new(min_score: u32, articles: usize, paragraphs: usize, chars: usize) -> Self {
        Self {
            min_score,
            articles,
            paragraphs,
            chars,
        }
    }
}

/// Question scoring and tier table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexitySection {
    /// Questions with more words than this score `long_question_weight`.
    pub long_question_words: usize,
    pub long_question_weight: u32,
    pub signals: Vec<SignalGroup>,
    /// Ordered by `min_score`, first row at 0.
    pub tiers: Vec<TierSpec>,
}

impl Default for ComplexitySection {
    fn default() -> Self {
        Self {
            long_question_words: 12,
            long_question_weight: 1,
            signals: vec![
                SignalGroup::new("conjunction", 2, &["and"]),
                SignalGroup::new("contrast", 3, &["vs", "versus"]),
                SignalGroup::new(
                    "comparison",
                    3,
                    &["compare", "comparison", "difference", "differ"],
                ),
                SignalGroup::new(
                    "causal",
                    2,
                    &[
                        "relationship",
                        "connect",
                        "relate",
                        "impact",
                        "affect",
                        "influence",
                        "cause",
                    ],
                ),
                SignalGroup::new("depth", 2, &["how does", "how do", "why", "explain"]),
                SignalGroup::new(
                    "historical",
                    2,
                    &["history", "evolution", "development", "origin"],
                ),
                SignalGroup::new(
                    "broad",
                    1,
                    &["overview", "summary", "introduction", "basics"],
                ),
                SignalGroup::new("futurity", 2, &["future", "predict", "will", "going to"]),
            ],
            tiers: vec![
                TierSpec::new(0, 3, 20, 8000),
                TierSpec::new(2, 4, 15, 8000),
                TierSpec::new(4, 5, 12, 8000),
                TierSpec::new(6, 6, 10, 8000),
                TierSpec::new(8, 7, 9, 8000),
            ],
        }
    }
}

impl ComplexitySection {
    /// Check that the tier table is well formed and monotone.
    ///
    /// A higher tier must never get fewer articles, fewer total paragraphs or
    /// fewer total characters than the tier below it.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.tiers.first() else {
            return Err(ConfigError::invalid("complexity.tiers", "at least one tier is required"));
        };
        if first.min_score != 0 {
            return Err(ConfigError::invalid(
                "complexity.tiers",
                "the first tier must have min_score = 0",
            ));
        }
        if let Some(t) = self
            .tiers
            .iter()
            .find(|t| t.articles == 0 || t.paragraphs == 0 || t.chars == 0)
        {
            return Err(ConfigError::invalid(
                "complexity.tiers",
                format!("tier at min_score {} has a zero budget", t.min_score),
            ));
        }

        for pair in self.tiers.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let at = higher.min_score;
            if higher.min_score <= lower.min_score {
                return Err(ConfigError::invalid(
                    "complexity.tiers",
                    format!("min_score must increase (tier at {at})"),
                ));
            }
            if higher.articles < lower.articles {
                return Err(ConfigError::invalid(
                    "complexity.tiers",
                    format!("tier at {at} has fewer articles than the tier below"),
                ));
            }
            if higher.articles * higher.paragraphs < lower.articles * lower.paragraphs {
                return Err(ConfigError::invalid(
                    "complexity.tiers",
                    format!("tier at {at} allows fewer total paragraphs than the tier below"),
                ));
            }
            if higher.articles * higher.chars < lower.articles * lower.chars {
                return Err(ConfigError::invalid(
                    "complexity.tiers",
                    format!("tier at {at} allows fewer total characters than the tier below"),
                ));
            }
        }

        if let Some(g) = self.signals.iter().find(|g| g.markers.is_empty()) {
            return Err(ConfigError::invalid(
                format!("complexity.signals.{}", g.name),
                "a signal group needs at least one marker",
            ));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Citations and Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Citation validation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationsSection {
    /// Fail the question when the answer cites a source that was not supplied.
    pub strict: bool,
}

/// Timeouts and concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Timeout for a single index search or lookup, in seconds.
    pub search_timeout_secs: u64,
    /// Timeout for a single article fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// Timeout for a single generation call, in seconds.
    pub generate_timeout_secs: u64,
    /// Overall timeout per question, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_timeout_secs: Option<u64>,
    pub search_concurrency: usize,
    pub fetch_concurrency: usize,
    /// Questions processed at once in batch mode.
    pub batch_concurrency: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            search_timeout_secs: 30,
            fetch_timeout_secs: 30,
            generate_timeout_secs: 600,
            question_timeout_secs: None,
            search_concurrency: 4,
            fetch_concurrency: 4,
            batch_concurrency: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
