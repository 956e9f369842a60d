//! Stage 2: write a cited answer from the budgeted articles.

use std::time::Duration;

use tome_config::SynthesisSection;
use tome_llm::{GenerateRequest, ModelRole, SharedBackend};

use crate::calls::generate;
use crate::citation::extract_markers;
use crate::error::Result;
use crate::prompt::synthesis_prompt;
use crate::types::{ArticleContent, SynthesisResult};

/// Sampling settings for Stage 2.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub call_timeout: Duration,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self::new(&SynthesisSection::default(), Duration::from_secs(600))
    }
}

impl SynthesisSettings {
    pub fn new(section: &SynthesisSection, call_timeout: Duration) -> Self {
        Self {
            temperature: section.temperature as f32,
            max_tokens: section.max_tokens,
            top_p: section.top_p as f32,
            repeat_penalty: section.repeat_penalty as f32,
            call_timeout,
        }
    }
}

/// Generates the final answer with the synthesis model.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    llm: SharedBackend,
    model: String,
    settings: SynthesisSettings,
}

impl AnswerSynthesizer {
    pub fn new(llm: SharedBackend, model: impl Into<String>, settings: SynthesisSettings) -> Self {
        Self {
            llm,
            model: model.into(),
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `question` from `articles`, numbered from 1 in the given order.
    pub async fn synthesize(
        &self,
        question: &str,
        articles: &[ArticleContent],
    ) -> Result<SynthesisResult> {
        let prompt = synthesis_prompt(question, articles);
        tracing::debug!(
            model = %self.model,
            articles = articles.len(),
            prompt_chars = prompt.len(),
            "Synthesizing answer"
        );

        let request = GenerateRequest::new(&self.model, prompt, self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens)
            .with_top_p(self.settings.top_p)
            .with_repeat_penalty(self.settings.repeat_penalty);

        let response = generate(
            &self.llm,
            request,
            self.settings.call_timeout,
            ModelRole::Synthesis,
        )
        .await?;

        if let Some(tokens) = response.completion_tokens {
            tracing::debug!(model = %self.model, tokens, "Synthesis complete");
        }

        let answer_text = response.text.trim().to_string();
        let citation_markers = extract_markers(&answer_text);
        Ok(SynthesisResult {
            answer_text,
            citation_markers,
        })
    }
}

impl std::fmt::Debug for AnswerSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerSynthesizer")
            .field("backend", &self.llm.name())
            .field("model", &self.model)
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tome_llm::{MockBackend, MockResponse};

    fn articles() -> Vec<ArticleContent> {
        vec![ArticleContent {
            title: "Photosynthesis".into(),
            paragraphs: vec!["Plants convert light into sugar.".into()],
            url: "mock://wiki/Photosynthesis".into(),
        }]
    }

    #[tokio::test]
    async fn test_synthesize_extracts_markers() {
        let backend = Arc::new(MockBackend::with_texts([
            "  Plants turn light into sugar [1]. See also [Article 1].\n",
        ]));
        let synthesizer =
            AnswerSynthesizer::new(backend.clone(), "llama3.1:8b", SynthesisSettings::default());

        let result = synthesizer
            .synthesize("What is photosynthesis?", &articles())
            .await
            .unwrap();
        assert_eq!(result.answer_text, "Plants turn light into sugar [1]. See also [Article 1].");
        assert_eq!(result.citation_markers, vec![1, 1]);

        let request = &backend.requests()[0];
        assert_eq!(request.max_tokens, Some(1500));
        assert!(request.repeat_penalty.is_some());
        assert!(request.prompt.contains("[Article 1] **Photosynthesis**"));
    }

    #[tokio::test]
    async fn test_unreachable_is_synthesis_error() {
        let backend = Arc::new(MockBackend::new(vec![MockResponse::Unreachable]));
        let synthesizer = AnswerSynthesizer::new(backend, "llama3.1:8b", SynthesisSettings::default());
        let err = synthesizer.synthesize("q", &articles()).await.unwrap_err();
        assert!(err.to_string().starts_with("synthesis generation failed"));
    }
}
