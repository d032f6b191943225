//! Run command handler.
//!
//! Interactive loop: one question per line until `quit`, `q`, `exit` or EOF.

use super::ask::print_outcome;
use clap::Args;
use std::io::Write;
use switchboard_agents::Pipeline;
use switchboard_core::{config::AppConfig, AppResult};
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_WORDS: [&str; 3] = ["quit", "q", "exit"];

/// Interactive question loop
#[derive(Args, Debug)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing run command");
        config.validate()?;

        let pipeline = Pipeline::from_config(config)?;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Ask about HR, Tech or Finance. Type 'quit' to leave.");
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };
            let query = line.trim();
            if query.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
                break;
            }

            // A failed query ends that query, not the session.
            match pipeline.handle(query).await {
                Ok(outcome) => print_outcome(&outcome, config.verbose),
                Err(e) => println!("Error: {}", e),
            }
            println!();
        }

        tracing::info!("Session ended");
        Ok(())
    }
}
