//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source document recorded in an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier (file base name)
    pub id: String,

    /// Path the source was read from
    pub path: Option<PathBuf>,

    /// Detected content type ("markdown", "html", "text")
    pub content_type: String,

    /// When this source was indexed
    pub learned_at: DateTime<Utc>,

    /// Cleaned text size in bytes
    pub size_bytes: u64,
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier (`<source_id>#<position>`)
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Window ordinal within the source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Character offsets (`char_start`, `char_end`)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub source_id: String,
    pub position: u32,
    pub text: String,

    /// Cosine similarity to the query
    pub score: f32,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Build metadata persisted next to every index as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    pub index_name: String,
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub chunk_count: u32,
    pub source_file: String,
    pub built_at: DateTime<Utc>,
}

/// Result of building one index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub index_name: String,

    /// Number of chunks written
    pub chunks_count: u32,

    /// Cleaned text bytes processed
    pub bytes_processed: u64,

    pub dimensions: usize,

    /// Duration in seconds
    pub duration_secs: f64,

    /// Directory of the published index
    pub path: PathBuf,
}

/// Statistics for a published index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub index_name: String,
    pub sources_count: u32,
    pub chunks_count: u32,

    /// SQLite file size in bytes
    pub db_size_bytes: u64,

    /// Manifest, when present and readable
    pub manifest: Option<IndexManifest>,
}
