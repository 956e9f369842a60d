//! Request and response types for text generation.

use serde::{Deserialize, Serialize};

/// A non-streaming, single-prompt generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. `llama3.1:8b`).
    pub model: String,
    /// The full prompt, sent as a single user message.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling cutoff.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Penalty applied to repeated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

impl GenerateRequest {
    /// Create a request with the given model, prompt and temperature.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
            top_p: None,
            repeat_penalty: None,
        }
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the nucleus sampling cutoff.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the repeat penalty.
    pub fn with_repeat_penalty(mut self, repeat_penalty: f32) -> Self {
        self.repeat_penalty = Some(repeat_penalty);
        self
    }
}

/// The generated text plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The model that produced the text.
    pub model: String,
    /// Generated text.
    pub text: String,
    /// Prompt tokens evaluated, if the service reported it.
    #[serde(default)]
    pub prompt_tokens: Option<u32>,
    /// Tokens generated, if the service reported it.
    #[serde(default)]
    pub completion_tokens: Option<u32>,
}

impl GenerateResponse {
    /// Create a response with only model and text.
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }
}
