//! Status command - service reachability and model resolution.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;
use std::collections::BTreeSet;

use tome_llm::{ModelRole, ResolvedModel, resolve_model};

use super::Context;
use super::services::{connect_backend, connect_index, preferences};

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// List every installed model
    #[arg(short, long)]
    pub detailed: bool,
}

/// Status for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    kiwix_url: String,
    kiwix_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kiwix_error: Option<String>,
    ollama_url: String,
    ollama_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ollama_error: Option<String>,
    installed_models: BTreeSet<String>,
    selection_model: Option<ResolvedModel>,
    synthesis_model: Option<ResolvedModel>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let index = connect_index(&ctx.config)?;
    let backend = connect_backend(&ctx.config)?;

    let kiwix_error = index.health_check().await.err().map(|e| e.to_string());
    let (installed_models, ollama_error) = match backend.list_models().await {
        Ok(models) => (models, None),
        Err(e) => (BTreeSet::new(), Some(e.to_string())),
    };

    let models = ctx.config.models();
    let (selection_prefs, synthesis_prefs) = preferences(&ctx.config);
    let reachable = ollama_error.is_none();
    let selection_model = reachable
        .then(|| {
            resolve_model(
                ModelRole::Selection,
                models.selection.as_deref(),
                &installed_models,
                &selection_prefs,
            )
        })
        .flatten();
    let synthesis_model = reachable
        .then(|| {
            resolve_model(
                ModelRole::Synthesis,
                models.synthesis.as_deref(),
                &installed_models,
                &synthesis_prefs,
            )
        })
        .flatten();

    let output = StatusOutput {
        kiwix_url: ctx.config.kiwix().url,
        kiwix_reachable: kiwix_error.is_none(),
        kiwix_error,
        ollama_url: ctx.config.ollama().url,
        ollama_reachable: reachable,
        ollama_error,
        installed_models,
        selection_model,
        synthesis_model,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_status(&output, args.detailed, ctx.verbose);
    }
    Ok(())
}

fn print_status(output: &StatusOutput, detailed: bool, verbose: bool) {
    let green = Style::new().green();
    let red = Style::new().red();
    let dim = Style::new().dim();
    let state = |ok: bool| {
        if ok {
            green.apply_to("● reachable")
        } else {
            red.apply_to("● unreachable")
        }
    };

    println!();
    println!("{}", style("Tome Status").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Kiwix:"), state(output.kiwix_reachable));
    println!("  {} {}", dim.apply_to("URL:"), output.kiwix_url);
    if let Some(e) = &output.kiwix_error
        && verbose
    {
        println!("  {} {}", dim.apply_to("Error:"), e);
    }
    println!();
    println!("  {} {}", dim.apply_to("Ollama:"), state(output.ollama_reachable));
    println!("  {} {}", dim.apply_to("URL:"), output.ollama_url);
    if let Some(e) = &output.ollama_error
        && verbose
    {
        println!("  {} {}", dim.apply_to("Error:"), e);
    }

    if output.ollama_reachable {
        println!(
            "  {} {}",
            dim.apply_to("Installed models:"),
            output.installed_models.len()
        );
        if detailed {
            for model in &output.installed_models {
                println!("    {}", model);
            }
        }
        println!();
        for (label, resolved) in [
            ("Selection model:", &output.selection_model),
            ("Synthesis model:", &output.synthesis_model),
        ] {
            match resolved {
                Some(m) => println!(
                    "  {} {} {}",
                    dim.apply_to(label),
                    m.name,
                    dim.apply_to(format!("({:?})", m.from).to_lowercase())
                ),
                None => println!(
                    "  {} {}",
                    dim.apply_to(label),
                    red.apply_to("none installed (try: ollama pull llama3.1:8b)")
                ),
            }
        }
    }

    if !output.kiwix_reachable {
        println!();
        println!(
            "  {}",
            dim.apply_to("Start kiwix-serve or run 'tome ask' to start it automatically")
        );
    }
    if !output.ollama_reachable {
        println!("  {}", dim.apply_to("Start Ollama with: ollama serve"));
    }
    println!();
}
