//! Rendering of outcomes for the terminal and for scripts.

use anyhow::Result;
use console::{Style, Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use tome_rag::{Answer, Outcome};

use super::Context;

/// Spinner on stderr while a question is processed. Only shown on a terminal
/// and never in JSON mode.
pub fn spinner(ctx: &Context, message: &str) -> Option<ProgressBar> {
    if ctx.json_output || !Term::stderr().is_term() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Print an outcome: pretty JSON or styled text.
pub fn print_outcome(outcome: &Outcome, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        Outcome::Answered(answer) => print_answer(answer, ctx.verbose),
        Outcome::NoInformation { reason, hint, .. } => {
            let yellow = Style::new().yellow();
            println!();
            println!("{}", yellow.apply_to(reason.to_string()));
            if let Some(hint) = hint {
                println!();
                println!("{}", Style::new().dim().apply_to(hint));
            }
            println!();
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer, verbose: bool) {
    let dim = Style::new().dim();

    println!();
    println!("{}", answer.answer_text);

    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        for source in &answer.sources {
            println!("  [{}] {}", source.index, source.title);
            println!("      {}", dim.apply_to(&source.url));
        }
    }

    if !answer.unresolved_citations.is_empty() {
        println!();
        println!(
            "{}",
            Style::new().yellow().apply_to(format!(
                "Note: the answer cites unknown source(s) {:?}",
                answer.unresolved_citations
            ))
        );
    }

    if verbose {
        println!();
        println!(
            "{}",
            dim.apply_to(format!(
                "selection: {} ({}) | synthesis: {} | articles: {} x {} paragraphs | {:.1}s",
                answer.selection_model,
                answer.selection_mode,
                answer.model,
                answer.tier.target_count,
                answer.tier.paragraphs_per_article,
                answer.elapsed.as_secs_f64()
            ))
        );
    }
    println!();
}

/// Print an error in the style of the other output.
pub fn print_error(message: &str) {
    let red = Style::new().red();
    eprintln!("{} {}", red.apply_to("Error:"), message);
}
