//! Text-generation client abstraction for Tome.
//!
//! The pipeline only ever needs two things from a language model service:
//! the list of installed models and a non-streaming completion for a single
//! prompt at a chosen temperature.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  LlmBackend trait                       │
//! │  - generate() -> GenerateResponse       │
//! │  - list_models() -> {model ids}         │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!      ┌────────┐        ┌───────────┐
//!      │ Ollama │        │   Mock    │
//!      └────────┘        └───────────┘
//! ```

pub mod backend;
pub mod error;
pub mod models;
pub mod ollama;
pub mod types;

pub use backend::{LlmBackend, SharedBackend, with_retry};
#[cfg(any(test, feature = "testing"))]
pub use backend::{MockBackend, MockResponse};
pub use error::{LlmError, Result};
pub use models::{ModelPreferences, ModelRole, ResolvedFrom, ResolvedModel, resolve_model};
pub use ollama::{DEFAULT_OLLAMA_URL, OllamaBackend, OllamaConfig, create_shared_backend};
pub use types::{GenerateRequest, GenerateResponse};
