//! Chat command - interactive question loop.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use super::Context;
use super::output::{print_error, print_outcome, spinner};
use super::services::{ModelOverrides, Services};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Synthesis model (Stage 2)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Selection model (Stage 1)
    #[arg(long)]
    pub selection_model: Option<String>,
}

/// Inputs that end the session.
fn is_exit(line: &str) -> bool {
    matches!(line.to_lowercase().as_str(), "quit" | "exit" | "q")
}

/// Run the chat command.
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let overrides = ModelOverrides {
        selection: args.selection_model,
        synthesis: args.model,
    };
    let services = Services::start(ctx, &overrides).await?;

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut editor: Editor<(), DefaultHistory> = Editor::with_config(config)?;
    let dim = Style::new().dim();

    println!();
    println!("{}", style("Tome").bold());
    println!(
        "{}",
        dim.apply_to(format!(
            "selection: {} | synthesis: {}",
            services.pipeline.selection_model(),
            services.pipeline.synthesis_model()
        ))
    );
    println!("{}", dim.apply_to("Ask a question, or type 'quit' to leave."));
    println!();

    loop {
        match editor.readline(&format!("{} ", style("?").cyan().bold())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if is_exit(line) {
                    break;
                }

                let progress = spinner(ctx, "Thinking...");
                let result = services.pipeline.answer(line).await;
                if let Some(pb) = progress {
                    pb.finish_and_clear();
                }
                match result {
                    Ok(outcome) => print_outcome(&outcome, ctx)?,
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", dim.apply_to("(Interrupted - type quit to exit)"));
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(e) => {
                print_error(&format!("Input error: {e}"));
                break;
            }
        }
    }

    services.shutdown().await;
    println!("{}", dim.apply_to("Goodbye!"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("quit"));
        assert!(is_exit("EXIT"));
        assert!(is_exit("q"));
        assert!(!is_exit("quantum"));
    }
}
