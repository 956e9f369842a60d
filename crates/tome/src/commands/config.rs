//! Config command - configuration management.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use tome_config::TomeConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration and where it came from
    Show,

    /// Write a config file with every default spelled out
    Init {
        /// Create project-local config (./tome.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Init { local, force } => cmd_init(local, force),
        ConfigCommand::Path => cmd_path(),
    }
}

/// Defaults with every configured section applied.
fn effective(config: &TomeConfig) -> TomeConfig {
    let mut effective = TomeConfig::with_defaults();
    effective.merge(config.clone());
    effective
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = effective(&ctx.config);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if ctx.config_sources.is_empty() {
        println!("# No config files loaded (using defaults)");
    } else {
        println!("# Config files (later overrides earlier):");
        for source in &ctx.config_sources {
            println!("#   {}", source.display());
        }
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn cmd_init(local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("tome.toml")
    } else {
        tome_config::user_config_path()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
    };

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    tome_config::save_config(&TomeConfig::with_defaults(), &path)?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_path() -> Result<()> {
    match tome_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => eprintln!("Could not determine config directory"),
    }
    Ok(())
}
