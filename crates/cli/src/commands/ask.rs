//! Ask command handler.
//!
//! Sends one question through routing, retrieval, generation and scoring.

use super::{print_json, score_label};
use clap::Args;
use switchboard_agents::{Pipeline, QueryOptions, QueryOutcome, RetrievalStatus};
use switchboard_core::{config::AppConfig, AppResult};

/// Answer a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Skip answer scoring
    #[arg(long)]
    pub no_eval: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        config.validate()?;

        let pipeline = Pipeline::from_config(config)?;
        let options = QueryOptions {
            skip_evaluation: self.no_eval,
            ..Default::default()
        };
        let outcome = pipeline.handle_with(&self.query, options).await?;

        if self.json {
            print_json(&outcome)
        } else {
            print_outcome(&outcome, config.verbose);
            Ok(())
        }
    }
}

/// Human-readable rendering shared by `ask` and `run`.
pub(crate) fn print_outcome(outcome: &QueryOutcome, verbose: bool) {
    let route = &outcome.route;
    if route.fallback {
        println!("Domain: {} (fallback)", route.domain.label());
    } else {
        println!("Domain: {}", route.domain.label());
    }

    println!();
    println!("{}", outcome.response.answer);
    println!();

    if let RetrievalStatus::Degraded { reason } = &outcome.retrieval {
        println!("Note: answered without reference material ({})", reason);
    }
    println!("Score: {}", score_label(&outcome.evaluation));

    if verbose {
        if outcome.response.chunks.is_empty() {
            println!("Sources: (none)");
        } else {
            println!("Sources:");
            for chunk in &outcome.response.chunks {
                println!("- {} (score {:.3})", chunk.id, chunk.score);
            }
        }
        let cost = if outcome.cost.known {
            format!("${:.4}", outcome.cost.usd)
        } else {
            "unknown".to_string()
        };
        println!(
            "Trace: {} ({} ms, {} answer tokens, cost {})",
            outcome.trace_id, outcome.latency_ms, outcome.response.usage.total_tokens, cost
        );
    }
}
