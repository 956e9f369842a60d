//! HTML extraction for kiwix-serve pages and paragraph budgeting.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::types::SearchHit;

/// Bracketed reference numbers such as `[12]`.
static REFERENCE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid reference regex"));

/// Content roots tried in order; the first present wins.
const CONTENT_ROOTS: [&str; 3] = ["div#mw-content-text", "div.mw-parser-output", "body"];

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Strip reference marks and collapse whitespace.
pub fn clean_paragraph(text: &str) -> String {
    let stripped = REFERENCE_MARK.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Apply a paragraph and character budget.
///
/// Paragraphs shorter than `min_chars` are skipped. Collection stops at
/// `max_paragraphs` or once the next paragraph would exceed `max_chars`; if
/// nothing has been collected yet, that paragraph is truncated to fit instead
/// so a single long opening paragraph still yields content.
pub fn budget_paragraphs<I>(
    paragraphs: I,
    max_paragraphs: usize,
    max_chars: usize,
    min_chars: usize,
) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut kept = Vec::new();
    let mut total = 0usize;

    for paragraph in paragraphs {
        if kept.len() >= max_paragraphs {
            break;
        }
        let len = paragraph.chars().count();
        if len < min_chars {
            continue;
        }
        if total + len > max_chars {
            if kept.is_empty() && max_chars > 0 {
                kept.push(truncate_chars(&paragraph, max_chars));
            }
            break;
        }
        total += len;
        kept.push(paragraph);
    }

    kept
}

/// Pick the lead excerpt from an article's paragraphs.
///
/// The first paragraph of at least `min_chars` characters, else the first
/// non-empty one, truncated to `max_chars`.
pub fn lead_excerpt(paragraphs: &[String], min_chars: usize, max_chars: usize) -> String {
    paragraphs
        .iter()
        .find(|p| p.chars().count() >= min_chars)
        .or_else(|| paragraphs.iter().find(|p| !p.is_empty()))
        .map(|p| truncate_chars(p, max_chars))
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join("")
}

/// Extract cleaned, non-empty paragraphs from an article page.
pub fn article_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(paragraph) = Selector::parse("p") else {
        return Vec::new();
    };

    for root in CONTENT_ROOTS {
        let Ok(selector) = Selector::parse(root) else {
            continue;
        };
        if let Some(content) = document.select(&selector).next() {
            return content
                .select(&paragraph)
                .map(|p| clean_paragraph(&element_text(p)))
                .filter(|p| !p.is_empty())
                .collect();
        }
    }

    Vec::new()
}

/// Parse a kiwix-serve search results page.
///
/// Relative links are resolved against `base_url`.
pub fn parse_search_results(html: &str, base_url: &str, limit: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(items), Ok(link), Ok(cite)) = (
        Selector::parse("div.results li"),
        Selector::parse("a"),
        Selector::parse("cite"),
    ) else {
        return Vec::new();
    };

    document
        .select(&items)
        .filter_map(|li| {
            let anchor = li.select(&link).next()?;
            let href = anchor.value().attr("href")?;
            let title = element_text(anchor).trim().to_string();
            if title.is_empty() {
                return None;
            }
            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("{}{}", base_url.trim_end_matches('/'), href)
            };
            let snippet = li
                .select(&cite)
                .next()
                .map(|c| clean_paragraph(&element_text(c)))
                .unwrap_or_default();
            Some(SearchHit::new(title, url).with_snippet(snippet))
        })
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"
        <html><body>
          <div id="mw-content-text">
            <p>Short.</p>
            <p>Photosynthesis is a process used by plants and other organisms to convert light energy into chemical energy [1] that can later be released.</p>
            <p>Most plants, algae, and cyanobacteria perform   photosynthesis;[23] such organisms are called photoautotrophs.</p>
          </div>
        </body></html>
    "#;

    const SEARCH: &str = r#"
        <html><body><div class="results"><ul>
          <li><a href="/wikipedia_en_all_maxi_2024-01/A/Photosynthesis">Photosynthesis</a>
              <cite>Photosynthesis is a process...</cite></li>
          <li><a href="http://other/A/Chlorophyll">Chlorophyll</a></li>
          <li><a href="/wikipedia_en_all_maxi_2024-01/A/C4_carbon_fixation">C4 carbon fixation</a></li>
        </ul></div></body></html>
    "#;

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_clean_paragraph() {
        assert_eq!(
            clean_paragraph("Light [1] energy[23]\n  is   stored."),
            "Light energy is stored."
        );
    }

    #[test]
    fn test_article_paragraphs() {
        let paragraphs = article_paragraphs(ARTICLE);
        assert_eq!(paragraphs.len(), 3);
        assert!(paragraphs[1].starts_with("Photosynthesis is a process"));
        assert!(!paragraphs[1].contains("[1]"));
        assert!(paragraphs[2].contains("perform photosynthesis; such"));
    }

    #[test]
    fn test_article_paragraphs_falls_back_to_body() {
        let paragraphs = article_paragraphs("<html><body><p>Plain body text.</p></body></html>");
        assert_eq!(paragraphs, vec!["Plain body text.".to_string()]);
    }

    #[test]
    fn test_lead_excerpt_prefers_substantial_paragraph() {
        let paragraphs = article_paragraphs(ARTICLE);
        let lead = lead_excerpt(&paragraphs, 100, 40);
        assert_eq!(lead.chars().count(), 40);
        assert!(lead.starts_with("Photosynthesis"));

        let short = vec!["Tiny.".to_string()];
        assert_eq!(lead_excerpt(&short, 100, 300), "Tiny.");
        assert_eq!(lead_excerpt(&[], 100, 300), "");
    }

    #[test]
    fn test_budget_paragraphs_limits() {
        let paragraphs: Vec<String> = (0..10).map(|i| format!("{i}{}", "x".repeat(59))).collect();

        let by_count = budget_paragraphs(paragraphs.clone(), 3, 10_000, 50);
        assert_eq!(by_count.len(), 3);

        let by_chars = budget_paragraphs(paragraphs.clone(), 10, 150, 50);
        assert_eq!(by_chars.len(), 2);

        let skipped = budget_paragraphs(vec!["short".to_string()], 5, 1000, 50);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_budget_paragraphs_truncates_oversized_first() {
        let kept = budget_paragraphs(vec!["y".repeat(500)], 5, 100, 50);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].len(), 100);
    }

    #[test]
    fn test_parse_search_results() {
        let hits = parse_search_results(SEARCH, "http://localhost:8080/", 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Photosynthesis");
        assert_eq!(
            hits[0].url,
            "http://localhost:8080/wikipedia_en_all_maxi_2024-01/A/Photosynthesis"
        );
        assert_eq!(hits[0].snippet.as_deref(), Some("Photosynthesis is a process..."));
        assert_eq!(hits[1].url, "http://other/A/Chlorophyll");
        assert!(hits[1].snippet.is_none());

        assert_eq!(parse_search_results(SEARCH, "http://x", 1).len(), 1);
        assert!(parse_search_results("<html></html>", "http://x", 5).is_empty());
    }
}
