//! Error types for the text-generation crate.

use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for text-generation operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Backend/API error from the service.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Network/connectivity error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// The requested model is not installed on the service.
    #[error("Model '{model}' not found on {service}. Install it with: ollama pull {model}")]
    ModelNotFound {
        /// The model that was requested.
        model: String,
        /// The service that reported it missing.
        service: String,
    },

    /// The backend cannot be built from its configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LlmError {
    /// Create a model-not-found error.
    pub fn model_not_found(model: impl Into<String>, service: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
            service: service.into(),
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true if the service could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            LlmError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            LlmError::Serialization(err.to_string())
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Serialization(err.to_string())
    }
}

/// Check if an error is retryable.
///
/// Only network errors are retried. A missing model will not appear by
/// asking again.
pub fn is_retryable(error: &LlmError) -> bool {
    error.is_retryable()
}
