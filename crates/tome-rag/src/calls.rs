//! Time-limited calls to the two external services.
//!
//! A timeout becomes a network error of the owning service, so it is
//! reported the same way as a refused connection.

use std::future::Future;
use std::time::Duration;

use tome_index::IndexError;
use tome_llm::{GenerateRequest, GenerateResponse, LlmError, ModelRole, SharedBackend};

use crate::error::{PipelineError, Result};

/// Run an index call under `limit`.
pub(crate) async fn index_call<T, F>(limit: Duration, what: &str, fut: F) -> tome_index::Result<T>
where
    F: Future<Output = tome_index::Result<T>>,
{
    tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
        Err(IndexError::Network(format!(
            "{what} timed out after {}s",
            limit.as_secs()
        )))
    })
}

/// Run a generation call under `limit`, attributing failures to `stage`.
pub(crate) async fn generate(
    llm: &SharedBackend,
    request: GenerateRequest,
    limit: Duration,
    stage: ModelRole,
) -> Result<GenerateResponse> {
    let model = request.model.clone();
    let result = tokio::time::timeout(limit, llm.generate(request))
        .await
        .unwrap_or_else(|_| {
            Err(LlmError::Network(format!(
                "generation timed out after {}s",
                limit.as_secs()
            )))
        });

    result.map_err(|source| PipelineError::Synthesis {
        stage,
        model,
        service: llm.endpoint(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tome_llm::{MockBackend, MockResponse};

    #[tokio::test(start_paused = true)]
    async fn test_index_call_timeout_is_network_error() {
        let err = index_call(Duration::from_secs(5), "search", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("search timed out after 5s"));
    }

    #[tokio::test]
    async fn test_generate_attributes_stage() {
        let llm: SharedBackend = Arc::new(MockBackend::new(vec![MockResponse::Unreachable]));
        let err = generate(
            &llm,
            GenerateRequest::new("mistral:7b", "p", 0.2),
            Duration::from_secs(5),
            ModelRole::Selection,
        )
        .await
        .unwrap_err();
        match err {
            PipelineError::Synthesis { stage, model, .. } => {
                assert_eq!(stage, ModelRole::Selection);
                assert_eq!(model, "mistral:7b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_generation_is_synthesis_error() {
        let llm: SharedBackend = Arc::new(
            MockBackend::with_texts(["too late"]).with_delay(Duration::from_secs(120)),
        );
        let err = generate(
            &llm,
            GenerateRequest::new("llama3:70b", "p", 0.2),
            Duration::from_secs(10),
            ModelRole::Synthesis,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("synthesis generation failed"));
        match err {
            PipelineError::Synthesis {
                stage,
                model,
                source,
                ..
            } => {
                assert_eq!(stage, ModelRole::Synthesis);
                assert_eq!(model, "llama3:70b");
                assert!(matches!(source, LlmError::Network(ref m) if m.contains("timed out after 10s")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
