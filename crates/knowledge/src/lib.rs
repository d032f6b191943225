//! Domain knowledge indexes.
//!
//! Each domain (HR, Tech, Finance) owns one similarity index built offline
//! from a single source document and stored under
//! `.switchboard/vectors/<name>/` as SQLite plus a JSON manifest.

pub mod builder;
pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod manifest;
pub mod parser;
pub mod similarity;
pub mod types;

#[cfg(test)]
mod tests;

pub use builder::{clean_index, index_name_for, index_stats, list_indexes, IndexBuilder};
pub use embeddings::{
    create_provider, embed_in_batches, provider_from_config, EmbeddingOptions, EmbeddingProvider,
};
pub use similarity::SimilarityIndex;
pub use types::{
    BuildReport, IndexManifest, IndexStats, KnowledgeChunk, KnowledgeSource, ScoredChunk,
};
