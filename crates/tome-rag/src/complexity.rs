//! Question complexity scoring and retrieval tiers.
//!
//! A question is scored from structural signals (comparison words, causal
//! words, length) and the score picks a row of the tier table. Harder
//! questions read more articles with fewer paragraphs each.

use serde::Serialize;
use tome_config::{ComplexitySection, SignalGroup, TierSpec};

/// How much to retrieve for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComplexityTier {
    /// Articles to select.
    pub target_count: usize,
    pub paragraphs_per_article: usize,
    pub char_budget_per_article: usize,
}

impl From<TierSpec> for ComplexityTier {
    fn from(spec: TierSpec) -> Self {
        Self {
            target_count: spec.articles,
            paragraphs_per_article: spec.paragraphs,
            char_budget_per_article: spec.chars,
        }
    }
}

/// Lowercase alphanumeric tokens.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Scores questions against configured signal groups.
#[derive(Debug, Clone)]
pub struct ComplexityEstimator {
    signals: Vec<(u32, Vec<Vec<String>>)>,
    long_question_words: usize,
    long_question_weight: u32,
    tiers: Vec<TierSpec>,
}

impl Default for ComplexityEstimator {
    fn default() -> Self {
        Self::new(&ComplexitySection::default())
    }
}

impl ComplexityEstimator {
    /// Build from a validated complexity section.
    pub fn new(config: &ComplexitySection) -> Self {
        let signals = config
            .signals
            .iter()
            .map(|SignalGroup { weight, markers, .. }| {
                (*weight, markers.iter().map(|m| tokenize(m)).collect())
            })
            .collect();

        let mut tiers = config.tiers.clone();
        tiers.sort_by_key(|t| t.min_score);

        Self {
            signals,
            long_question_words: config.long_question_words,
            long_question_weight: config.long_question_weight,
            tiers,
        }
    }

    /// Structural score of a question. Each signal group counts once.
    pub fn score(&self, question: &str) -> u32 {
        let tokens = tokenize(question);

        let mut score: u32 = self
            .signals
            .iter()
            .filter(|(_, markers)| markers.iter().any(|m| contains_marker(&tokens, m)))
            .map(|(weight, _)| weight)
            .sum();

        if question.split_whitespace().count() > self.long_question_words {
            score += self.long_question_weight;
        }
        score
    }

    /// Tier for a question.
    pub fn estimate(&self, question: &str) -> ComplexityTier {
        let score = self.score(question);
        let tier = self.tier_for_score(score);
        tracing::debug!(
            score,
            target_count = tier.target_count,
            paragraphs = tier.paragraphs_per_article,
            "Estimated question complexity"
        );
        tier
    }

    /// Tier reached by `score`: the last row whose `min_score` it meets.
    pub fn tier_for_score(&self, score: u32) -> ComplexityTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_score <= score)
            .or(self.tiers.first())
            .copied()
            .map(ComplexityTier::from)
            .unwrap_or(FALLBACK_TIER)
    }

    /// Tier with an explicit article count.
    ///
    /// Per-article budgets come from the smallest tier that reads at least
    /// `count` articles, else from the largest tier.
    pub fn tier_for_count(&self, count: usize) -> ComplexityTier {
        let count = count.max(1);
        let base = self
            .tiers
            .iter()
            .find(|t| t.articles >= count)
            .or(self.tiers.last())
            .copied()
            .map(ComplexityTier::from)
            .unwrap_or(FALLBACK_TIER);
        ComplexityTier {
            target_count: count,
            ..base
        }
    }
}

/// Used only if the tier table is empty, which validation rejects.
const FALLBACK_TIER: ComplexityTier = ComplexityTier {
    target_count: 3,
    paragraphs_per_article: 20,
    char_budget_per_article: 8000,
};

/// Shortest marker word that also matches its inflections.
const MIN_INFLECTED_MARKER: usize = 4;

/// Endings accepted after a marker word.
const INFLECTIONS: &[&str] = &["s", "es", "d", "ed", "ing", "ion", "ions", "ent", "al", "ly"];

fn matches_marker_word(token: &str, word: &str) -> bool {
    if token == word {
        return true;
    }
    word.chars().count() >= MIN_INFLECTED_MARKER
        && token
            .strip_prefix(word)
            .is_some_and(|rest| INFLECTIONS.contains(&rest))
}

/// Marker words match consecutive tokens, whole or inflected: `cause`
/// matches `causes` but `will` does not match `william`. Words shorter than
/// four letters (`and`, `vs`) only match whole.
fn contains_marker(tokens: &[String], marker: &[String]) -> bool {
    if marker.is_empty() || marker.len() > tokens.len() {
        return false;
    }
    tokens.windows(marker.len()).any(|window| {
        window
            .iter()
            .zip(marker)
            .all(|(token, word)| matches_marker_word(token, word))
    })
}
