//! Error types for the pipeline crate.

use thiserror::Error;
use tome_index::IndexError;
use tome_llm::{LlmError, ModelRole};

/// Result type alias using the pipeline error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error type for answering a question.
///
/// "Nothing found" is not an error; it is the `NoInformation` outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The content index is unreachable or failing.
    #[error("Content index error: {0}")]
    Retrieval(#[from] IndexError),

    /// A generation call failed in either stage.
    #[error("{stage} generation failed (model '{model}' on {service}): {source}")]
    Synthesis {
        /// Which stage made the call.
        stage: ModelRole,
        /// Model that was requested.
        model: String,
        /// Service that was called.
        service: String,
        #[source]
        source: LlmError,
    },

    /// Invalid configuration or no usable model.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The answer cited sources that were not supplied (strict mode only).
    #[error("Answer cites unknown source(s) {unresolved:?}; only {available} were supplied")]
    Citation {
        /// Out-of-range markers, ascending.
        unresolved: Vec<u32>,
        /// Number of supplied sources.
        available: usize,
    },

    /// The whole question exceeded its time limit.
    #[error("Question timed out after {secs}s")]
    Timeout {
        /// Configured limit.
        secs: u64,
    },

    /// The question cannot be processed as given.
    #[error("Invalid question: {0}")]
    InvalidQuestion(String),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns true if the failed model is missing from the service.
    pub fn is_model_not_found(&self) -> bool {
        matches!(
            self,
            Self::Synthesis {
                source: LlmError::ModelNotFound { .. },
                ..
            }
        )
    }
}

impl From<tome_config::ConfigError> for PipelineError {
    fn from(err: tome_config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
