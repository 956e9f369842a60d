//! Heuristic ordering of candidates before Stage 1.
//!
//! Main articles on the question's topic rise. List, disambiguation, index
//! and year pages sink. Pinned candidates keep their leading places, and
//! equal scores keep retrieval order.

use regex::Regex;
use std::cmp::Reverse;
use std::sync::LazyLock;

use tome_config::RetrievalSection;

use crate::focus::QueryFocus;
use crate::types::Candidate;

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

const MEDIA_BONUS: i32 = 100;
const LIST_PENALTY: i32 = 50;
const INDEX_PAGE_PENALTY: i32 = 40;
const YEAR_PENALTY: i32 = 30;
const PHRASE_MATCH_BONUS: i32 = 200;
const PHRASE_MISS_PENALTY: i32 = 90;
const KEYWORD_MATCH_BONUS: i32 = 80;
const KEYWORD_MISS_PENALTY: i32 = 60;
const ABSTRACT_KEYWORD_BONUS: i32 = 25;
const SHORT_TITLE_BONUS: i32 = 5;
const SHORT_TITLE_CHARS: usize = 30;

/// Scores and orders candidates.
#[derive(Debug, Clone)]
pub struct CandidateRanker {
    enabled: bool,
    /// Lowercased media title suffixes.
    media_suffixes: Vec<String>,
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self::new(&RetrievalSection::default())
    }
}

impl CandidateRanker {
    pub fn new(config: &RetrievalSection) -> Self {
        Self {
            enabled: config.prioritize_focus,
            media_suffixes: config
                .media_suffixes
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Relevance score of one candidate. `phrase_present` is whether any
    /// candidate in the set matches a focus phrase.
    pub fn score(&self, candidate: &Candidate, focus: &QueryFocus, phrase_present: bool) -> i32 {
        let title = candidate.raw_title.to_lowercase();
        let mut score = 0;

        if self.media_suffixes.iter().any(|s| title.contains(s.as_str())) {
            score += MEDIA_BONUS;
        }
        if title.starts_with("list of") || title.starts_with("lists of") {
            score -= LIST_PENALTY;
        }
        if title.contains("disambiguation") || title.contains("index of") {
            score -= INDEX_PAGE_PENALTY;
        }
        if YEAR.is_match(&title) {
            score -= YEAR_PENALTY;
        }

        if phrase_present {
            score += if focus.title_matches_phrase(&candidate.raw_title) {
                PHRASE_MATCH_BONUS
            } else {
                -PHRASE_MISS_PENALTY
            };
        }

        if let Some(lead) = candidate.lead_excerpt.as_deref() {
            score += match lead.chars().count() {
                n if n > 200 => 20,
                n if n > 100 => 10,
                _ => 0,
            };
            let lead = lead.to_lowercase();
            if focus.keywords.iter().any(|k| lead.contains(k.as_str())) {
                score += ABSTRACT_KEYWORD_BONUS;
            }
        }

        if title.chars().count() < SHORT_TITLE_CHARS {
            score += SHORT_TITLE_BONUS;
        }
        if !focus.keywords.is_empty() {
            score += if focus.title_matches_keywords(&candidate.raw_title) {
                KEYWORD_MATCH_BONUS
            } else {
                -KEYWORD_MISS_PENALTY
            };
        }
        score
    }

    /// Stable sort of the unpinned candidates by descending score.
    pub fn rank(&self, candidates: &mut [Candidate], focus: &QueryFocus) {
        if !self.enabled {
            return;
        }
        let pinned = candidates.iter().take_while(|c| c.pinned).count();
        let phrase_present = candidates
            .iter()
            .any(|c| focus.title_matches_phrase(&c.raw_title));

        candidates[pinned..].sort_by_cached_key(|c| Reverse(self.score(c, focus, phrase_present)));
    }
}
