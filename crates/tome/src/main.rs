//! Tome - answers questions from an offline encyclopedia with local models
//!
//! Main entry point for the Tome CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ask, batch, chat, config, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Tome - answers questions from an offline encyclopedia with local models
#[derive(Parser)]
#[command(name = "tome")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Extra config file, applied over the discovered ones
    #[arg(long, global = true, env = "TOME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Kiwix server URL (default: http://localhost:8080)
    #[arg(long, global = true, env = "TOME_KIWIX_URL")]
    pub kiwix_url: Option<String>,

    /// Ollama URL (default: http://localhost:11434)
    #[arg(long, global = true, env = "TOME_OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Never start kiwix-serve, even if nothing answers at the Kiwix URL
    #[arg(long, global = true)]
    pub no_auto_start: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Answer one question
    Ask(ask::AskArgs),

    /// Ask questions interactively
    Chat(chat::ChatArgs),

    /// Answer questions from a file, one per line
    Batch(batch::BatchArgs),

    /// Show service reachability and resolved models
    Status(status::StatusArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "tome=debug,tome_rag=debug,tome_index=debug,tome_llm=debug,tome_config=debug,info"
    } else {
        "tome=warn,tome_rag=warn,tome_index=warn,tome_llm=warn,warn"
    };

    let log_dir = tome_config::log_dir().unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tome.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "tome=trace,tome_rag=trace,tome_index=trace,tome_llm=trace,tome_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context::load(
        cli.config.as_deref(),
        cli.kiwix_url,
        cli.ollama_url,
        cli.no_auto_start,
        cli.json,
        cli.verbose,
    )?;

    match cli.command {
        Commands::Ask(args) => ask::run(args, &ctx).await,
        Commands::Chat(args) => chat::run(args, &ctx).await,
        Commands::Batch(args) => batch::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
