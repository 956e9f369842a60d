//! Query focus: keywords and phrases that name the question's topic.

use crate::terms::{is_skip_word, is_stopword, quoted_spans};
use crate::types::SearchTerm;

const MAX_KEYWORDS: usize = 6;
const MAX_PHRASES: usize = 4;

/// Lowercase ASCII-alphanumeric tokens joined by single spaces.
fn normalize_for_match(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_blacklisted(token: &str) -> bool {
    is_stopword(token) || is_skip_word(token)
}

/// Topic keywords and multi-word phrases of a question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFocus {
    /// Lowercase keywords and adjacent keyword pairs.
    pub keywords: Vec<String>,
    /// Multi-word spans that name the topic.
    pub phrases: Vec<String>,
}

impl QueryFocus {
    /// Derive focus from the question and its extracted terms.
    pub fn from_question(question: &str, terms: &[SearchTerm]) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        let mut push_token = |token: &str| {
            if token.len() >= 3 && !is_blacklisted(token) && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        };
        for token in normalize_for_match(question).split(' ') {
            push_token(token);
        }
        for term in terms {
            for token in normalize_for_match(&term.text).split(' ') {
                push_token(token);
            }
        }

        let mut keywords = tokens.clone();
        for pair in tokens.windows(2) {
            let joined = format!("{} {}", pair[0], pair[1]);
            if !keywords.contains(&joined) {
                keywords.push(joined);
            }
        }
        keywords.truncate(MAX_KEYWORDS);

        let mut phrases: Vec<String> = Vec::new();
        let spans = quoted_spans(question)
            .into_iter()
            .chain(terms.iter().map(|t| t.text.clone()));
        for span in spans {
            if normalize_for_match(&span).split(' ').count() >= 2 && !phrases.contains(&span) {
                phrases.push(span);
            }
        }
        phrases.truncate(MAX_PHRASES);

        Self { keywords, phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.phrases.is_empty()
    }

    /// Enough keywords appear in the title: two when there are three or
    /// more keywords, else one.
    pub fn title_matches_keywords(&self, title: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        let title = normalize_for_match(title);
        let hits = self
            .keywords
            .iter()
            .map(|k| normalize_for_match(k))
            .filter(|k| !k.is_empty() && title.contains(k.as_str()))
            .count();
        let needed = if self.keywords.len() >= 3 { 2 } else { 1 };
        hits >= needed
    }

    /// Some phrase's tokens appear in order among the title's tokens.
    pub fn title_matches_phrase(&self, title: &str) -> bool {
        let title = normalize_for_match(title);
        let title_tokens: Vec<&str> = title.split(' ').filter(|t| !t.is_empty()).collect();
        if title_tokens.is_empty() {
            return false;
        }
        self.phrases.iter().any(|phrase| {
            let phrase = normalize_for_match(phrase);
            let mut remaining = title_tokens.iter();
            let mut words = phrase.split(' ').filter(|t| !t.is_empty()).peekable();
            words.peek().is_some() && words.all(|word| remaining.any(|t| *t == word))
        })
    }

    /// One-line hints for the selection prompt.
    pub fn prompt_notes(&self) -> String {
        let quote = |items: &[String], n: usize| {
            items
                .iter()
                .take(n)
                .map(|s| format!("\"{s}\""))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut notes = String::new();
        if !self.keywords.is_empty() {
            notes.push_str(&format!("Primary topic keywords: {}\n", quote(&self.keywords, 4)));
        }
        if !self.phrases.is_empty() {
            notes.push_str(&format!("Focus phrases: {}\n", quote(&self.phrases, 2)));
        }
        notes
    }
}
