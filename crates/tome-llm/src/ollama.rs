//! Ollama backend implementation.
//!
//! Talks to the native Ollama HTTP API: `POST /api/chat` (non-streaming) for
//! generation and `GET /api/tags` for the installed model list.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{LlmBackend, with_retry};
use crate::error::{LlmError, Result};
use crate::types::{GenerateRequest, GenerateResponse};

/// Default Ollama base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default timeout for requests. Local inference on CPU is slow.
const DEFAULT_TIMEOUT_SECS: u64 = 600;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Maximum retries for transient errors.
    pub max_retries: u32,

    /// Initial backoff duration for retries.
    pub retry_backoff: Duration,

    /// Name for this backend instance.
    pub name: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            name: "ollama".to_string(),
        }
    }
}

impl OllamaConfig {
    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ollama Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Ollama API backend.
pub struct OllamaBackend {
    client: Client,
    config: OllamaConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend with the given configuration.
    pub fn new(config: OllamaConfig) -> Result<Self> {
        match reqwest::Url::parse(&config.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(LlmError::Config(format!(
                    "Invalid Ollama URL '{}': expected http:// or https://",
                    config.base_url
                )));
            }
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a backend with default local settings.
    pub fn local() -> Result<Self> {
        Self::new(OllamaConfig::default())
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.base_url)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.config.base_url)
    }

    fn to_chat_request(request: &GenerateRequest) -> OllamaChatRequest {
        OllamaChatRequest {
            model: request.model.clone(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                top_p: request.top_p,
                repeat_penalty: request.repeat_penalty,
            },
        }
    }

    /// Handle a chat response.
    async fn handle_response(&self, response: Response, model: &str) -> Result<GenerateResponse> {
        if !response.status().is_success() {
            return Err(self.handle_error_response(response, model).await);
        }

        let body = response.text().await?;
        let parsed: OllamaChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))?;

        Ok(parsed.into())
    }

    /// Handle an error response.
    async fn handle_error_response(&self, response: Response, model: &str) -> LlmError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<OllamaErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

        match status {
            StatusCode::NOT_FOUND if message.contains("not found") => {
                LlmError::model_not_found(model, self.endpoint())
            }
            s if s.is_server_error() => LlmError::Backend(format!("Server error: {}", message)),
            _ => LlmError::Backend(message),
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let chat_request = Self::to_chat_request(&request);

        tracing::debug!(
            backend = %self.config.name,
            model = %chat_request.model,
            prompt_chars = request.prompt.len(),
            temperature = request.temperature,
            "Sending Ollama chat request"
        );

        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || async {
                let response = self
                    .client
                    .post(self.chat_url())
                    .header(header::CONTENT_TYPE, "application/json")
                    .json(&chat_request)
                    .send()
                    .await?;

                self.handle_response(response, &chat_request.model).await
            },
        )
        .await
    }

    async fn list_models(&self) -> Result<BTreeSet<String>> {
        with_retry(
            self.config.max_retries,
            self.config.retry_backoff,
            &self.config.name,
            || async {
                let response = self.client.get(self.tags_url()).send().await?;
                if !response.status().is_success() {
                    let status = response.status();
                    return Err(LlmError::Backend(format!(
                        "Listing models failed with HTTP {}",
                        status
                    )));
                }
                let tags: OllamaTagsResponse = response.json().await?;
                Ok(tags.models.into_iter().map(|m| m.name).collect())
            },
        )
        .await
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn endpoint(&self) -> String {
        format!("{} ({})", self.config.name, self.config.base_url)
    }
}

/// Create a shared Ollama backend.
pub fn create_shared_backend(config: OllamaConfig) -> Result<Arc<dyn LlmBackend>> {
    Ok(Arc::new(OllamaBackend::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, serde::Serialize)]
struct OllamaOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl From<OllamaChatResponse> for GenerateResponse {
    fn from(resp: OllamaChatResponse) -> Self {
        GenerateResponse {
            model: resp.model,
            text: resp.message.content,
            prompt_tokens: resp.prompt_eval_count,
            completion_tokens: resp.eval_count,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

#[derive(Debug, serde::Deserialize)]
struct OllamaModelTag {
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct OllamaErrorResponse {
    error: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> OllamaBackend {
        let config = OllamaConfig::default()
            .with_base_url(server.uri())
            .with_max_retries(0);
        OllamaBackend::new(config).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = OllamaConfig::default();
        assert_eq!(config.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.name, "ollama");
        assert_eq!(config.timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = OllamaConfig::default().with_base_url("http://gpu-box:11434/");
        assert_eq!(config.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        for url in ["localhost:11434", "not a url", "ftp://gpu-box:11434"] {
            let config = OllamaConfig::default().with_base_url(url);
            let err = OllamaBackend::new(config).err().expect("rejected");
            assert!(matches!(err, LlmError::Config(ref m) if m.contains(url)), "{url}: {err}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_chat_request_options() {
        let request = GenerateRequest::new("llama3.1:8b", "hi", 0.7)
            .with_max_tokens(1500)
            .with_repeat_penalty(1.1);
        let chat = OllamaBackend::to_chat_request(&request);
        let json = serde_json::to_value(&chat).unwrap();

        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["options"]["num_predict"], 1500);
        assert!(json["options"].get("top_p").is_none());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({"model": "llama3.1:8b", "stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.1:8b",
                "message": {"role": "assistant", "content": "Photosynthesis converts light [1]."},
                "done": true,
                "eval_count": 12
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let response = backend
            .generate(GenerateRequest::new("llama3.1:8b", "explain", 0.7))
            .await
            .unwrap();

        assert_eq!(response.text, "Photosynthesis converts light [1].");
        assert_eq!(response.completion_tokens, Some(12));
    }

    #[tokio::test]
    async fn test_generate_model_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": "model \"ghost:7b\" not found, try pulling it first"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .generate(GenerateRequest::new("ghost:7b", "p", 0.2))
            .await
            .unwrap_err();

        match err {
            LlmError::ModelNotFound { model, service } => {
                assert_eq!(model, "ghost:7b");
                assert!(service.contains(&server.uri()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "out of memory"
            })))
            .mount(&server)
            .await;

        let err = backend_for(&server)
            .generate(GenerateRequest::new("m", "p", 0.2))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Backend(ref m) if m.contains("out of memory")));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [
                    {"name": "llama3.1:8b", "model": "llama3.1:8b", "size": 1},
                    {"name": "mistral:7b", "model": "mistral:7b", "size": 1}
                ]
            })))
            .mount(&server)
            .await;

        let models = backend_for(&server).list_models().await.unwrap();
        assert!(models.contains("llama3.1:8b"));
        assert!(models.contains("mistral:7b"));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let config = OllamaConfig::default()
            .with_base_url("http://127.0.0.1:1")
            .with_max_retries(0)
            .with_timeout(Duration::from_secs(2));
        let backend = OllamaBackend::new(config).unwrap();

        let err = backend.list_models().await.unwrap_err();
        assert!(err.is_unreachable());
    }
}
