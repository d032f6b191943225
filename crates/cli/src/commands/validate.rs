//! Validate command handler.
//!
//! Replays labeled cases and exits non-zero when routing accuracy or mean
//! answer score falls below the gate.

use super::{print_json, score_label};
use clap::Args;
use std::path::PathBuf;
use switchboard_agents::validation::{MEAN_SCORE_THRESHOLD, ROUTING_ACCURACY_THRESHOLD};
use switchboard_agents::{load_cases, validate, Pipeline, ValidationOptions, ValidationReport};
use switchboard_core::{config::AppConfig, AppError, AppResult};

/// Replay labeled cases and grade routing and answer quality
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Cases file (default: <workspace>/tests/golden_data.json)
    #[arg(long)]
    pub cases: Option<PathBuf>,

    /// Score only the first N cases
    #[arg(long)]
    pub sample: Option<usize>,

    /// Cases in flight at once
    #[arg(long, default_value = "1")]
    pub concurrency: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing validate command");
        config.validate()?;

        let path = self
            .cases
            .clone()
            .unwrap_or_else(|| config.workspace.join("tests").join("golden_data.json"));
        let cases = load_cases(&path)?;

        let pipeline = Pipeline::from_config(config)?;
        let options = ValidationOptions {
            max_concurrency: self.concurrency.max(1),
            quality_sample: self.sample,
        };
        let report = validate(&pipeline, &cases, &options).await;

        if self.json {
            print_json(&report)?;
        } else {
            print_report(&report);
        }

        if report.passed() {
            Ok(())
        } else {
            Err(AppError::Evaluation(format!(
                "Validation gate failed: routing accuracy {:.1}% (need {:.0}%), mean score {} (need {:.1})",
                report.routing_accuracy,
                ROUTING_ACCURACY_THRESHOLD,
                report
                    .mean_score
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "n/a".to_string()),
                MEAN_SCORE_THRESHOLD
            )))
        }
    }
}

fn pass_label(pass: bool) -> &'static str {
    if pass {
        "PASS"
    } else {
        "FAIL"
    }
}

fn print_report(report: &ValidationReport) {
    println!("Routing");
    println!(
        "  Accuracy: {}/{} ({:.1}%) [{}]",
        report.correct,
        report.total,
        report.routing_accuracy,
        pass_label(report.routing_pass)
    );
    for (domain, breakdown) in &report.by_domain {
        let difficulty = breakdown
            .difficulty
            .iter()
            .map(|(level, count)| format!("{} {}", count, level))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<8} {}/{} ({:.1}%), {}",
            domain.label(),
            breakdown.correct,
            breakdown.cases,
            breakdown.accuracy,
            difficulty
        );
    }

    println!();
    println!("Answer quality");
    match report.mean_score {
        Some(mean) => println!(
            "  Mean score: {:.2}/10 [{}]",
            mean,
            pass_label(report.quality_pass)
        ),
        None => println!("  Mean score: n/a [{}]", pass_label(report.quality_pass)),
    }
    if let (Some(min), Some(max)) = (report.min_score, report.max_score) {
        println!("  Range: {}-{}", min, max);
    }
    println!("  Scored: {}, unscored: {}", report.scored, report.unscored);
    for (domain, breakdown) in &report.by_domain {
        if let Some(mean) = breakdown.mean_score {
            println!("  {:<8} {:.2}", domain.label(), mean);
        }
    }

    if !report.mismatches.is_empty() {
        println!();
        println!("Mismatches");
        for case in &report.mismatches {
            let observed = case
                .observed
                .map(|d| d.label().to_string())
                .unwrap_or_else(|| "error".to_string());
            println!(
                "  {}: expected {}, got {} ({}) - {}",
                case.id,
                case.expected.label(),
                observed,
                score_label(&case.evaluation),
                case.query
            );
            if let Some(error) = &case.error {
                println!("    {}", error);
            }
        }
    }

    println!();
    println!(
        "Overall: {}",
        if report.passed() { "PASSED" } else { "FAILED" }
    );
}
