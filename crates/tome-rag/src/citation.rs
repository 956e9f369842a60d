//! Inline citation extraction and resolution.
//!
//! Recognized markers: `[1]`, `[1][2]`, `[1, 2]` and `[Article 3]`.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::types::{ArticleContent, Source};

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:article\s+)?(\d+(?:\s*,\s*\d+)*)\]").expect("valid citation regex")
});

/// Marker numbers in order of appearance, repeats included.
///
/// Numbers too large for `u32` saturate to `u32::MAX`, so they still
/// resolve as out of range.
pub fn extract_markers(text: &str) -> Vec<u32> {
    MARKER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .flat_map(|m| {
            m.as_str()
                .split(',')
                .map(|n| n.trim().parse::<u32>().unwrap_or(u32::MAX))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Markers resolved against the supplied articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationMap {
    /// Cited sources, ascending by index, each once.
    pub sources: Vec<Source>,
    /// Markers outside `1..=articles.len()`, ascending, each once.
    pub unresolved: Vec<u32>,
}

/// Resolve markers to the 1-based article list they refer to.
///
/// Supplied articles that are never cited are left out.
pub fn map_citations(markers: &[u32], articles: &[ArticleContent]) -> CitationMap {
    let unique: BTreeSet<u32> = markers.iter().copied().collect();
    let mut map = CitationMap::default();

    for index in unique {
        match usize::try_from(index)
            .ok()
            .filter(|&i| i >= 1)
            .and_then(|i| articles.get(i - 1))
        {
            Some(article) => map.sources.push(Source {
                index,
                title: article.title.clone(),
                url: article.url.clone(),
            }),
            None => map.unresolved.push(index),
        }
    }

    if !map.unresolved.is_empty() {
        tracing::warn!(
            unresolved = ?map.unresolved,
            available = articles.len(),
            "Answer cites sources that were not supplied"
        );
    }
    map
}
