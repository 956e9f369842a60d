//! Search term extraction.
//!
//! Encyclopedia titles are singular, title-cased and free of question words,
//! so the extractor pulls quoted spans, proper-noun runs and salient content
//! words out of the question and shapes them like titles.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::types::SearchTerm;

/// Question and function words never used as terms.
pub(crate) const STOPWORDS: &[&str] = &[
    "what", "when", "where", "who", "whom", "whose", "why", "which", "how", "is", "are", "was",
    "were", "am", "been", "being", "does", "do", "did", "done", "doing", "can", "could", "will",
    "would", "shall", "should", "may", "might", "must", "the", "a", "an", "and", "or", "but",
    "if", "then", "in", "on", "at", "to", "for", "of", "with", "by", "from", "about", "as",
    "into", "through", "during", "before", "after", "above", "below", "its", "it", "has", "have",
    "had", "having", "this", "that", "these", "those", "me", "you", "tell", "explain",
    "describe", "define", "cause", "causes", "caused", "become", "became", "get", "got", "make",
    "made", "take", "took",
];

/// Content words too generic to be article titles.
pub(crate) const SKIP_WORDS: &[&str] = &[
    "them", "this", "that", "these", "those", "some", "many", "much", "more", "most", "good",
    "show", "shows", "movie", "movies", "film", "films", "series", "season", "seasons", "tv",
    "television", "program", "programme", "programs", "programmes", "episode", "episodes",
    "worth", "watch", "watching", "best", "worst", "great", "awesome", "awful", "game", "games",
    "review", "reviews", "rating", "ratings", "people", "person", "thing", "things",
];

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)"|“([^”]+)”|(?:^|\s)'([^']+)'"#).expect("valid quote regex")
});

pub(crate) fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

pub(crate) fn is_skip_word(word: &str) -> bool {
    SKIP_WORDS.contains(&word)
}

/// Spans the user put in quotes, trimmed, longer than two characters.
pub fn quoted_spans(question: &str) -> Vec<String> {
    QUOTED
        .captures_iter(question)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| s.chars().count() > 2)
        .collect()
}

fn strip_word(word: &str) -> &str {
    let word = word.trim_matches(|c: char| "?.,!:;\"“”()".contains(c));
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("’s"))
        .unwrap_or(word)
        .trim_matches('\'')
}

/// Runs of capitalized words that do not start with a stopword.
pub fn proper_nouns(question: &str) -> Vec<String> {
    let words: Vec<&str> = question.split_whitespace().map(strip_word).collect();
    let starts_upper = |w: &str| w.chars().next().is_some_and(char::is_uppercase);

    let mut nouns = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        if starts_upper(word) && !is_stopword(&word.to_lowercase()) {
            let mut j = i + 1;
            while j < words.len() && starts_upper(words[j]) {
                j += 1;
            }
            nouns.push(words[i..j].join(" "));
            i = j;
        } else {
            i += 1;
        }
    }
    nouns
}

/// Lowercase words of four or more characters that are not stopwords.
pub fn content_words(question: &str) -> Vec<String> {
    question
        .split_whitespace()
        .map(|w| strip_word(w).to_lowercase())
        .filter(|w| w.chars().count() >= 4 && !is_stopword(w))
        .collect()
}

/// `"earthquakes"` -> `"Earthquakes"`.
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Naive singular form for title lookups.
///
/// Only words longer than five characters are touched, and `-ss`, `-us` and
/// `-is` endings are left alone (`Photosynthesis`, `Virus`).
pub fn singularize(word: &str) -> String {
    if word.chars().count() <= 5 {
        return word.to_string();
    }
    let lower = word.to_lowercase();
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Derives ordered search terms from a question.
#[derive(Debug, Clone)]
pub struct SearchTermExtractor {
    max_terms: usize,
}

impl Default for SearchTermExtractor {
    fn default() -> Self {
        Self { max_terms: 5 }
    }
}

impl SearchTermExtractor {
    pub fn new(max_terms: usize) -> Self {
        Self {
            max_terms: max_terms.max(1),
        }
    }

    /// Extract terms; never empty.
    ///
    /// The first term is the direct-lookup guess when one exists.
    pub fn extract(&self, question: &str) -> Vec<SearchTerm> {
        let quoted = quoted_spans(question);
        let nouns = proper_nouns(question);
        let words = content_words(question);
        let salient: Vec<&String> = words.iter().filter(|w| !is_skip_word(w)).collect();

        let direct = quoted
            .first()
            .cloned()
            .or_else(|| nouns.first().cloned())
            .or_else(|| salient.first().map(|w| singularize(&title_case(w))));

        let mut candidates: Vec<SearchTerm> = Vec::new();
        if let Some(direct) = direct {
            candidates.push(SearchTerm::direct(direct));
        }
        candidates.extend(quoted.iter().map(SearchTerm::new));
        candidates.extend(nouns.iter().take(3).map(SearchTerm::new));
        candidates.extend(
            words
                .iter()
                .take(5)
                .filter(|w| !is_skip_word(w))
                .map(|w| SearchTerm::new(title_case(w))),
        );
        for pair in words.windows(2).take(2) {
            if !is_skip_word(&pair[0]) && !is_skip_word(&pair[1]) {
                candidates.push(SearchTerm::new(format!("{} {}", title_case(&pair[0]), pair[1])));
            }
        }

        let mut seen = HashSet::new();
        let mut terms: Vec<SearchTerm> = candidates
            .into_iter()
            .filter(|t| !t.text.trim().is_empty() && seen.insert(t.text.to_lowercase()))
            .take(self.max_terms)
            .collect();

        if terms.is_empty() {
            terms.push(SearchTerm::new(question.trim()));
        }

        tracing::debug!(
            terms = ?terms.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            "Extracted search terms"
        );
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(terms: &[SearchTerm]) -> Vec<&str> {
        terms.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_simple_question() {
        let terms = SearchTermExtractor::default().extract("What is photosynthesis?");
        assert_eq!(texts(&terms), vec!["Photosynthesis"]);
        assert!(terms[0].direct_lookup);
    }

    #[test]
    fn test_plural_direct_lookup_is_singular() {
        let terms = SearchTermExtractor::default().extract("What causes earthquakes?");
        assert_eq!(terms[0].text, "Earthquake");
        assert!(terms[0].direct_lookup);
        assert!(texts(&terms).contains(&"Earthquakes"));
    }

    #[test]
    fn test_proper_noun_run() {
        let terms = SearchTermExtractor::default().extract("Who was Albert Einstein's wife?");
        assert_eq!(terms[0].text, "Albert Einstein");
        assert!(terms[0].direct_lookup);
        // case-insensitive duplicate of the proper noun is dropped
        assert!(!texts(&terms).contains(&"Albert einstein"));
        assert!(texts(&terms).contains(&"Einstein"));
    }

    #[test]
    fn test_quoted_span_first() {
        let terms =
            SearchTermExtractor::default().extract("Is \"The Expanse\" a good show to watch?");
        assert_eq!(terms[0].text, "The Expanse");
        assert!(terms[0].direct_lookup);
        assert!(!texts(&terms).iter().any(|t| t.eq_ignore_ascii_case("show")));
    }

    #[test]
    fn test_terms_bounded_and_deduplicated() {
        let terms = SearchTermExtractor::default().extract(
            "Explain the relationship between Quantum Mechanics and General Relativity in cosmology",
        );
        assert!(terms.len() <= 5);
        let lowered: HashSet<String> = terms.iter().map(|t| t.text.to_lowercase()).collect();
        assert_eq!(lowered.len(), terms.len());
        assert_eq!(terms.iter().filter(|t| t.direct_lookup).count(), 1);
    }

    #[test]
    fn test_fallback_to_question() {
        let terms = SearchTermExtractor::default().extract("  who is it?  ");
        assert_eq!(texts(&terms), vec!["who is it?"]);
        assert!(!terms[0].direct_lookup);
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("Earthquakes"), "Earthquake");
        assert_eq!(singularize("Theories"), "Theory");
        assert_eq!(singularize("Photosynthesis"), "Photosynthesis");
        assert_eq!(singularize("Glass"), "Glass");
        assert_eq!(singularize("Cactus"), "Cactus");
        assert_eq!(singularize("Cats"), "Cats");
    }

    #[test]
    fn test_quoted_spans_ignore_apostrophes() {
        assert_eq!(quoted_spans("What's Einstein's theory?"), Vec::<String>::new());
        assert_eq!(quoted_spans("Tell me about 'Dune' please"), vec!["Dune"]);
    }
}
