//! Build command handler.
//!
//! Parses, chunks and embeds source documents into per-domain indexes.

use super::{parse_domain, print_json};
use clap::Args;
use std::path::PathBuf;
use switchboard_core::{config::AppConfig, AppError, AppResult};
use switchboard_knowledge::{provider_from_config, IndexBuilder};

/// Build one similarity index per source document
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Source documents (.md, .txt); the index is named after the file stem
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Publish the index under this domain instead of the file stem
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing build command for {} sources", self.sources.len());
        config.validate()?;

        let index_name = match &self.domain {
            Some(domain) if self.sources.len() > 1 => {
                return Err(AppError::InvalidInput(format!(
                    "--domain {} needs exactly one source, got {}",
                    domain,
                    self.sources.len()
                )));
            }
            Some(domain) => Some(parse_domain(domain)?.index_name()),
            None => None,
        };

        let builder = IndexBuilder::from_config(config, provider_from_config(config)?);

        let mut reports = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let report = builder.build(source, index_name).await?;
            if !self.json {
                println!(
                    "Built index '{}' from {:?}: {} chunks ({} bytes, {} dims) in {:.2}s",
                    report.index_name,
                    source,
                    report.chunks_count,
                    report.bytes_processed,
                    report.dimensions,
                    report.duration_secs
                );
            }
            reports.push(report);
        }

        if self.json {
            print_json(&reports)?;
        }

        Ok(())
    }
}
