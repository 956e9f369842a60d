//! Search hit type and title normalization.

use serde::{Deserialize, Serialize};

/// One result of a content-index search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Article title as displayed by the index.
    pub title: String,
    /// Short text snippet, when the index provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Absolute article URL.
    pub url: String,
}

impl SearchHit {
    /// Create a hit without a snippet.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: None,
            url: url.into(),
        }
    }

    /// Attach a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        self.snippet = (!snippet.trim().is_empty()).then_some(snippet);
        self
    }

    /// Case/whitespace-insensitive key for this hit's title.
    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Normalize a title for identity comparison.
///
/// Lowercases, treats `_` as a space and collapses whitespace, so
/// `"Albert_Einstein"`, `"albert  einstein"` and `"Albert Einstein"` compare
/// equal.
pub fn normalize_title(title: &str) -> String {
    title
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
