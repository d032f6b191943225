//! Stats command handler.
//!
//! Shows chunk counts and build metadata for the domain indexes, and which
//! prompts the workspace overrides.

use super::{parse_domain, print_json};
use clap::Args;
use switchboard_agents::Domain;
use switchboard_core::{config::AppConfig, AppResult};
use switchboard_knowledge::{index_stats, list_indexes, IndexStats};
use switchboard_prompt::{list_prompts, PromptOrigin};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Limit to one domain (hr, tech, finance)
    pub domain: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let vectors_dir = config.vectors_dir();

        let stats: Vec<IndexStats> = match &self.domain {
            Some(domain) => vec![index_stats(&vectors_dir, parse_domain(domain)?.index_name())?],
            None => {
                let published = list_indexes(&vectors_dir)?;
                Domain::ALL
                    .iter()
                    .filter(|domain| published.iter().any(|name| name == domain.index_name()))
                    .map(|domain| index_stats(&vectors_dir, domain.index_name()))
                    .collect::<AppResult<_>>()?
            }
        };

        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            return print_json(&serde_json::json!({
                "indexes": stats,
                "prompts": prompts,
            }));
        }

        if stats.is_empty() {
            println!(
                "No indexes in {:?}. Run 'switchboard build' first.",
                vectors_dir
            );
        }

        for index in &stats {
            println!("Index: {}", index.index_name);
            println!("  Chunks: {}", index.chunks_count);
            println!("  Sources: {}", index.sources_count);
            println!("  DB size: {} bytes", index.db_size_bytes);
            if let Some(manifest) = &index.manifest {
                println!(
                    "  Embedding: {}/{} ({} dims)",
                    manifest.embedding_provider, manifest.embedding_model, manifest.dimensions
                );
                println!(
                    "  Chunking: size {}, overlap {}",
                    manifest.chunk_size, manifest.chunk_overlap
                );
                println!("  Built: {} from {}", manifest.built_at, manifest.source_file);
            }
        }

        println!("Prompts:");
        for prompt in &prompts {
            let origin = match prompt.origin {
                PromptOrigin::Builtin => "built-in",
                PromptOrigin::Workspace => "workspace",
            };
            println!("  {} ({})", prompt.id, origin);
        }

        Ok(())
    }
}
