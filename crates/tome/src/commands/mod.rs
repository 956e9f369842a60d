//! CLI command handlers.

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use tome_config::TomeConfig;

pub mod ask;
pub mod batch;
pub mod chat;
pub mod config;
pub mod output;
pub mod services;
pub mod status;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration: files, then CLI overrides.
    pub config: TomeConfig,
    /// Config files that were applied, lowest precedence first.
    pub config_sources: Vec<PathBuf>,
    /// Start kiwix-serve when nothing answers at the Kiwix URL.
    pub auto_start: bool,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load layered configuration and apply CLI overrides.
    pub fn load(
        config_file: Option<&Path>,
        kiwix_url: Option<String>,
        ollama_url: Option<String>,
        no_auto_start: bool,
        json_output: bool,
        verbose: bool,
    ) -> Result<Self> {
        let loaded = tome_config::load_config(None, None)?;
        for warning in &loaded.warnings {
            tracing::warn!("{warning}");
        }

        let mut config_sources: Vec<PathBuf> =
            loaded.loaded_from().into_iter().map(Path::to_path_buf).collect();
        let mut config = loaded.config;

        if let Some(path) = config_file {
            let layer = tome_config::load_config_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?;
            config.merge(layer);
            config_sources.push(path.to_path_buf());
        }

        if let Some(url) = kiwix_url {
            let mut kiwix = config.kiwix();
            kiwix.url = url;
            config.kiwix = Some(kiwix);
        }
        if let Some(url) = ollama_url {
            let mut ollama = config.ollama();
            ollama.url = url;
            config.ollama = Some(ollama);
        }

        let auto_start = !no_auto_start && config.kiwix().auto_start;

        Ok(Self {
            config,
            config_sources,
            auto_start,
            json_output,
            verbose,
        })
    }
}
