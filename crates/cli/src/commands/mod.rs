//! Command handlers for the switchboard CLI.
//!
//! Each subcommand lives in its own submodule.

pub mod ask;
pub mod build;
pub mod clean;
pub mod run;
pub mod stats;
pub mod validate;

pub use ask::AskCommand;
pub use build::BuildCommand;
pub use clean::CleanCommand;
pub use run::RunCommand;
pub use stats::StatsCommand;
pub use validate::ValidateCommand;

use serde::Serialize;
use switchboard_agents::{Domain, EvaluationOutcome};
use switchboard_core::{AppError, AppResult};

/// Print `value` to stdout as pretty JSON.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Serialization(format!("JSON serialization failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Parse a domain argument ("hr", "HRAgent", ...).
pub(crate) fn parse_domain(value: &str) -> AppResult<Domain> {
    Domain::parse(value).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unknown domain '{}'. Expected one of: hr, tech, finance",
            value
        ))
    })
}

pub(crate) fn score_label(evaluation: &EvaluationOutcome) -> String {
    match evaluation.score() {
        Some(score) => format!("{}/10", score),
        None => "no score".to_string(),
    }
}
