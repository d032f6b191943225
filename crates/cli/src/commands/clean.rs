//! Clean command handler.

use super::parse_domain;
use clap::Args;
use switchboard_core::{config::AppConfig, AppResult};
use switchboard_knowledge::clean_index;

/// Delete a domain index
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Domain whose index is removed (hr, tech, finance)
    pub domain: String,
}

impl CleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let domain = parse_domain(&self.domain)?;
        tracing::info!("Executing clean command for {}", domain);

        clean_index(&config.vectors_dir(), domain.index_name())?;

        println!("Index '{}' removed", domain.index_name());
        Ok(())
    }
}
