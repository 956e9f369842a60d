//! Batch command - answer many questions, one per input line.

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

use tome_rag::Outcome;

use super::Context;
use super::output::{print_outcome, spinner};
use super::services::{ModelOverrides, Services};

/// Arguments for the batch command.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File with one question per line, or '-' for stdin
    pub input: PathBuf,

    /// Synthesis model (Stage 2)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Selection model (Stage 1)
    #[arg(long)]
    pub selection_model: Option<String>,
}

/// One JSON line of batch output.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchLine<'a> {
    Outcome(&'a Outcome),
    Error { question: &'a str, error: String },
}

/// Non-empty trimmed lines, skipping `#` comments.
fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read questions from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// Run the batch command.
pub async fn run(args: BatchArgs, ctx: &Context) -> Result<()> {
    let questions = parse_questions(&read_input(&args.input)?);
    if questions.is_empty() {
        anyhow::bail!("No questions found in {}", args.input.display());
    }

    let overrides = ModelOverrides {
        selection: args.selection_model,
        synthesis: args.model,
    };
    let services = Services::start(ctx, &overrides).await?;

    let progress = spinner(ctx, &format!("Answering {} questions...", questions.len()));
    let results = services.pipeline.answer_batch(&questions).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    services.shutdown().await;

    let mut failures = 0;
    let bold = Style::new().bold();
    for (question, result) in questions.iter().zip(&results) {
        if ctx.json_output {
            let line = match result {
                Ok(outcome) => BatchLine::Outcome(outcome),
                Err(e) => BatchLine::Error {
                    question,
                    error: e.to_string(),
                },
            };
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("{}", bold.apply_to(format!("Q: {question}")));
            match result {
                Ok(outcome) => print_outcome(outcome, ctx)?,
                Err(e) => {
                    println!("{} {}", Style::new().red().apply_to("Error:"), e);
                    println!();
                }
            }
        }
        if result.is_err() {
            failures += 1;
        }
    }

    tracing::info!(
        questions = questions.len(),
        failures,
        "Batch complete"
    );
    if failures == questions.len() {
        anyhow::bail!("All {failures} questions failed");
    }
    Ok(())
}
