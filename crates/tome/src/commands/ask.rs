//! Ask command - answer a single question.

use anyhow::Result;
use clap::Args;

use super::Context;
use super::output::{print_outcome, spinner};
use super::services::{ModelOverrides, Services};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question to answer
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Synthesis model (Stage 2)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Selection model (Stage 1)
    #[arg(long)]
    pub selection_model: Option<String>,

    /// Number of articles to read, overriding the complexity estimate
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u16).range(1..=50))]
    pub max_results: Option<u16>,
}

/// Run the ask command.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let question = args.question.join(" ");
    let overrides = ModelOverrides {
        selection: args.selection_model,
        synthesis: args.model,
    };
    let services = Services::start(ctx, &overrides).await?;

    let progress = spinner(ctx, "Searching the encyclopedia...");
    let result = services
        .pipeline
        .answer_with(&question, args.max_results.map(usize::from))
        .await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    services.shutdown().await;

    print_outcome(&result?, ctx)
}
