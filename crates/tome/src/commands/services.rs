//! Service setup shared by the question-answering commands.
//!
//! Starts kiwix-serve when needed, connects both services, resolves the two
//! models and assembles the pipeline. The server handle lives as long as
//! [`Services`] does.

use anyhow::{Context as _, Result};
use std::time::Duration;

use tome_config::TomeConfig;
use tome_index::{KiwixConfig, KiwixServer, ServerConfig, SharedIndex, create_shared_index};
use tome_llm::{
    ModelPreferences, ModelRole, OllamaConfig, ResolvedModel, SharedBackend,
    create_shared_backend, resolve_model,
};
use tome_rag::{Pipeline, PipelineError};

use super::Context;

/// Model names given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub selection: Option<String>,
    pub synthesis: Option<String>,
}

/// Running services and the pipeline built on them.
pub struct Services {
    pub pipeline: Pipeline,
    server: Option<KiwixServer>,
}

impl Services {
    /// Bring everything up for answering questions.
    pub async fn start(ctx: &Context, overrides: &ModelOverrides) -> Result<Self> {
        let server = start_server(ctx).await?;

        let index = connect_index(&ctx.config)?;
        let backend = connect_backend(&ctx.config)?;
        let (selection, synthesis) = resolve_models(&backend, &ctx.config, overrides).await?;
        tracing::info!(
            selection = %selection.name,
            synthesis = %synthesis.name,
            "Resolved models"
        );

        let pipeline = Pipeline::builder()
            .with_index(index)
            .with_backend(backend)
            .with_models(selection.name, synthesis.name)
            .with_config(ctx.config.clone())
            .build()?;

        Ok(Self { pipeline, server })
    }

    /// Stop kiwix-serve if this process started it.
    pub async fn shutdown(self) {
        if let Some(server) = self.server {
            server.stop().await;
        }
    }
}

/// Start kiwix-serve unless disabled or already running.
pub async fn start_server(ctx: &Context) -> Result<Option<KiwixServer>> {
    if !ctx.auto_start {
        return Ok(None);
    }
    let kiwix = ctx.config.kiwix();
    let config = ServerConfig {
        url: kiwix.url,
        binary: kiwix.binary,
        zim_dirs: kiwix.zim_dirs,
        ..Default::default()
    };
    KiwixServer::ensure_running(&config)
        .await
        .context("Kiwix server is not available")
}

pub fn connect_index(config: &TomeConfig) -> Result<SharedIndex> {
    let kiwix = config.kiwix();
    let mut index_config = KiwixConfig::default()
        .with_base_url(kiwix.url)
        .with_book(kiwix.book)
        .with_timeout(Duration::from_secs(kiwix.timeout_secs))
        .with_max_retries(kiwix.max_retries)
        .with_min_paragraph_chars(kiwix.min_paragraph_chars);
    index_config.restrict_search = kiwix.restrict_search;
    Ok(create_shared_index(index_config)?)
}

pub fn connect_backend(config: &TomeConfig) -> Result<SharedBackend> {
    let ollama = config.ollama();
    let backend_config = OllamaConfig::default()
        .with_base_url(ollama.url)
        .with_timeout(Duration::from_secs(ollama.timeout_secs))
        .with_max_retries(ollama.max_retries);
    Ok(create_shared_backend(backend_config)?)
}

/// Preference lists with config overrides applied.
pub fn preferences(config: &TomeConfig) -> (ModelPreferences, ModelPreferences) {
    let models = config.models();

    let mut selection = ModelPreferences::selection();
    if let Some(preferred) = models.selection_preferences {
        selection.preferred = preferred;
    }
    if let Some(excluded) = models.excluded {
        selection.excluded = excluded;
    }

    let mut synthesis = ModelPreferences::synthesis();
    if let Some(preferred) = models.synthesis_preferences {
        synthesis.preferred = preferred;
    }
    (selection, synthesis)
}

/// Resolve the Stage 1 and Stage 2 models against the installed set.
pub async fn resolve_models(
    backend: &SharedBackend,
    config: &TomeConfig,
    overrides: &ModelOverrides,
) -> Result<(ResolvedModel, ResolvedModel)> {
    let service = backend.endpoint();
    let available = backend
        .list_models()
        .await
        .with_context(|| format!("Cannot list models on {service}. Is Ollama running? Start it with: ollama serve"))?;

    let models = config.models();
    let (selection_prefs, synthesis_prefs) = preferences(config);

    let pick = |role: ModelRole, explicit: Option<&str>, prefs: &ModelPreferences| {
        resolve_model(role, explicit, &available, prefs).ok_or_else(|| {
            let suggestion = prefs
                .preferred
                .first()
                .map(String::as_str)
                .unwrap_or("llama3.1:8b");
            PipelineError::config(format!(
                "No usable {role} model installed on {service}. Install one with: ollama pull {suggestion}"
            ))
        })
    };

    let selection = pick(
        ModelRole::Selection,
        overrides.selection.as_deref().or(models.selection.as_deref()),
        &selection_prefs,
    )?;
    let synthesis = pick(
        ModelRole::Synthesis,
        overrides.synthesis.as_deref().or(models.synthesis.as_deref()),
        &synthesis_prefs,
    )?;
    Ok((selection, synthesis))
}
