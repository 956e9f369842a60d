//! Prompt templates for both generation stages.

use crate::focus::QueryFocus;
use crate::types::{ArticleContent, Candidate};

/// Excerpts longer than this are shortened in the selection prompt.
const EXCERPT_PREVIEW_CHARS: usize = 200;

fn preview(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Stage 1 prompt: numbered candidates, 1-based.
pub fn selection_prompt(
    question: &str,
    candidates: &[Candidate],
    target_count: usize,
    focus: &QueryFocus,
) -> String {
    let mut listing = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        listing.push_str(&format!("{}. **{}**\n", i + 1, candidate.raw_title));
        match candidate.lead_excerpt.as_deref().filter(|e| !e.is_empty()) {
            Some(excerpt) => listing.push_str(&format!("   {}\n\n", preview(excerpt))),
            None => listing.push_str("   (no excerpt)\n\n"),
        }
    }

    let notes = focus.prompt_notes();
    let notes = if notes.is_empty() {
        String::new()
    } else {
        format!("{notes}\n")
    };

    format!(
        r#"You are choosing encyclopedia articles that will be used to answer a question.

Question: "{question}"

{notes}Candidate articles:
{listing}
Task: pick up to {target_count} articles that are MOST RELEVANT to the question.

Rules:
1. Always include the main article about the question's primary topic
   ("earthquakes" -> "Earthquake", not "List of earthquakes").
2. If topic keywords are given above, chosen articles should mention them
   (or obvious singular/plural variants) in the title or excerpt.
3. If focus phrases are given above, prefer titles containing that phrase.
4. Match the intent: "Who is X?" wants a biography, "What causes X?" wants
   the article explaining X, "Is X good?" wants the main article about X.
5. Reject:
   - lists, indexes, year pages and disambiguation pages
   - stubs with almost no content
   - articles about a different topic that merely shares a word
   - entertainment or sports articles (songs, episodes, teams, films)
     unless the question asks about them directly

Output ONLY the article numbers, comma-separated, most relevant first
(example: 2,5,8).
"#
    )
}

/// Stage 2 prompt: article contents tagged `[Article n]`, 1-based.
pub fn synthesis_prompt(question: &str, articles: &[ArticleContent]) -> String {
    let source_list = articles
        .iter()
        .enumerate()
        .map(|(i, a)| format!("[{}] {}", i + 1, a.title))
        .collect::<Vec<_>>()
        .join("\n");

    let contents = articles
        .iter()
        .enumerate()
        .map(|(i, a)| format!("[Article {}] **{}**:\n{}", i + 1, a.title, a.text()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are a research analyst answering a question from the encyclopedia articles below.

Question: "{question}"

Available articles:
{source_list}

Article contents:
{contents}

Instructions:
1. Open with a sentence that answers the question directly.
2. Use information from all relevant articles and connect it into one
   coherent explanation. Note where the articles disagree.
3. Use only the articles above; do not add facts they do not contain.
4. Cite every fact inline with the article number right after it, e.g.
   "Light is absorbed by chlorophyll [1] inside chloroplasts [1][2]."
   Multiple sources may be written [1][2] or [1, 2].
5. Only cite numbers from the list above.

Format:
- Plain paragraphs with inline citations; lists only when essential.
- Do not repeat the question.
- Do not add a "References", "Sources" or "Bibliography" section.

Answer:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, excerpt: Option<&str>) -> Candidate {
        Candidate {
            title: title.to_lowercase(),
            raw_title: title.to_string(),
            lead_excerpt: excerpt.map(String::from),
            url: String::new(),
            pinned: false,
        }
    }

    #[test]
    fn test_selection_prompt_numbers_from_one() {
        let candidates = vec![
            candidate("Photosynthesis", Some("Plants convert light.")),
            candidate("Chlorophyll", None),
        ];
        let prompt = selection_prompt("What is photosynthesis?", &candidates, 3, &QueryFocus::default());
        assert!(prompt.contains("1. **Photosynthesis**\n   Plants convert light."));
        assert!(prompt.contains("2. **Chlorophyll**\n   (no excerpt)"));
        assert!(prompt.contains("up to 3 articles"));
        assert!(!prompt.contains("Primary topic keywords"));
    }

    #[test]
    fn test_selection_prompt_includes_focus_notes() {
        let focus = QueryFocus {
            keywords: vec!["expanse".into()],
            phrases: vec!["The Expanse".into()],
        };
        let prompt = selection_prompt("Is The Expanse good?", &[candidate("Expanse", None)], 3, &focus);
        assert!(prompt.contains("Primary topic keywords: \"expanse\""));
        assert!(prompt.contains("Focus phrases: \"The Expanse\""));
    }

    #[test]
    fn test_long_excerpt_previewed() {
        let long = "x".repeat(500);
        let prompt = selection_prompt("q", &[candidate("T", Some(&long))], 1, &QueryFocus::default());
        assert!(prompt.contains(&format!("{}...", "x".repeat(200))));
        assert!(!prompt.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_synthesis_prompt_tags_articles() {
        let articles = vec![
            ArticleContent {
                title: "Photosynthesis".into(),
                paragraphs: vec!["Para one.".into(), "Para two.".into()],
                url: String::new(),
            },
            ArticleContent {
                title: "Chloroplast".into(),
                paragraphs: vec!["Organelle.".into()],
                url: String::new(),
            },
        ];
        let prompt = synthesis_prompt("What is photosynthesis?", &articles);
        assert!(prompt.contains("[1] Photosynthesis\n[2] Chloroplast"));
        assert!(prompt.contains("[Article 1] **Photosynthesis**:\nPara one.\n\nPara two."));
        assert!(prompt.contains("[Article 2] **Chloroplast**:\nOrganelle."));
    }
}
