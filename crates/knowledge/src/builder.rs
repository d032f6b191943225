//! Offline index builder.
//!
//! Turns one source document into one published similarity index:
//! parse, chunk, embed in batches, write SQLite + manifest into a temporary
//! sibling directory, then swap it into place with renames.

use crate::chunker::chunk_text;
use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::index::{get_stats, init_index, insert_chunk, insert_source, open_index, INDEX_FILE};
use crate::manifest::{read_manifest, write_manifest, MANIFEST_FILE};
use crate::parser::{parse_file, ContentType};
use crate::types::{BuildReport, IndexManifest, IndexStats, KnowledgeChunk, KnowledgeSource};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use switchboard_core::{AppConfig, AppError, AppResult};

/// Builds, inspects and removes the indexes under one vectors directory.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    vectors_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(
        vectors_dir: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunk_size: usize,
        chunk_overlap: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            vectors_dir: vectors_dir.into(),
            embedder,
            chunk_size,
            chunk_overlap,
            batch_size,
        }
    }

    /// Builder for the workspace and chunking settings in `config`.
    pub fn from_config(config: &AppConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(
            config.vectors_dir(),
            embedder,
            config.retrieval.chunk_size,
            config.retrieval.chunk_overlap,
            config.embedding.batch_size,
        )
    }

    pub fn vectors_dir(&self) -> &Path {
        &self.vectors_dir
    }

    /// Directory of the published index `index_name`.
    pub fn index_dir(&self, index_name: &str) -> PathBuf {
        self.vectors_dir.join(index_name)
    }

    /// Build (or fully rebuild) one index from `source`.
    ///
    /// The index name defaults to the lower-cased file stem (`HR.md` -> `hr`).
    pub async fn build(&self, source: &Path, index_name: Option<&str>) -> AppResult<BuildReport> {
        let start = Instant::now();
        let index_name = match index_name {
            Some(name) => validate_index_name(&name.to_lowercase())?,
            None => index_name_for(source)?,
        };

        tracing::info!("Building index '{}' from {:?}", index_name, source);

        let text = parse_file(source)?;
        let source_id = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Knowledge(format!("Invalid source path: {:?}", source)))?
            .to_string();

        let candidates = chunk_text(&source_id, &text, self.chunk_size, self.chunk_overlap);
        if candidates.is_empty() {
            tracing::warn!("Source {:?} produced no chunks; index '{}' will be empty", source, index_name);
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await?;

        let chunks: Vec<KnowledgeChunk> = candidates
            .into_iter()
            .zip(embeddings)
            .map(|(candidate, embedding)| KnowledgeChunk {
                id: format!("{}#{}", candidate.source_id, candidate.position),
                source_id: candidate.source_id,
                position: candidate.position,
                text: candidate.text,
                embedding: Some(embedding),
                metadata: candidate.metadata,
            })
            .collect();

        let manifest = IndexManifest {
            index_name: index_name.clone(),
            embedding_provider: self.embedder.provider_name().to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            chunk_count: chunks.len() as u32,
            source_file: source_id.clone(),
            built_at: Utc::now(),
        };

        let knowledge_source = KnowledgeSource {
            id: source_id,
            path: Some(source.to_path_buf()),
            content_type: ContentType::from_path(source).as_str().to_string(),
            learned_at: manifest.built_at,
            size_bytes: text.len() as u64,
        };

        let staging = self
            .vectors_dir
            .join(format!(".{}.tmp-{}", index_name, uuid::Uuid::new_v4()));
        if let Err(e) = write_index(&staging, &knowledge_source, &chunks, &manifest) {
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }

        let target = self.index_dir(&index_name);
        publish(&staging, &target)?;

        let duration = start.elapsed();
        tracing::info!(
            "Index '{}' published: {} chunks, {} bytes in {:.2}s",
            index_name,
            manifest.chunk_count,
            knowledge_source.size_bytes,
            duration.as_secs_f64()
        );

        Ok(BuildReport {
            index_name,
            chunks_count: manifest.chunk_count,
            bytes_processed: knowledge_source.size_bytes,
            dimensions: manifest.dimensions,
            duration_secs: duration.as_secs_f64(),
            path: target,
        })
    }

    /// Statistics for a published index.
    pub fn stats(&self, index_name: &str) -> AppResult<IndexStats> {
        index_stats(&self.vectors_dir, index_name)
    }

    /// Names of all published indexes, sorted.
    pub fn list(&self) -> AppResult<Vec<String>> {
        list_indexes(&self.vectors_dir)
    }

    /// Remove a published index.
    pub fn clean(&self, index_name: &str) -> AppResult<()> {
        clean_index(&self.vectors_dir, index_name)
    }
}

/// Statistics for the index `index_name` under `vectors_dir`.
pub fn index_stats(vectors_dir: &Path, index_name: &str) -> AppResult<IndexStats> {
    let dir = vectors_dir.join(index_name);
    let db_path = dir.join(INDEX_FILE);
    if !db_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Index '{}' does not exist",
            index_name
        )));
    }

    let conn = open_index(&db_path)?;
    let (sources_count, chunks_count) = get_stats(&conn)?;
    let db_size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let manifest = match read_manifest(&dir.join(MANIFEST_FILE)) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!("Index '{}' has no readable manifest: {}", index_name, e);
            None
        }
    };

    Ok(IndexStats {
        index_name: index_name.to_string(),
        sources_count,
        chunks_count,
        db_size_bytes,
        manifest,
    })
}

/// Names of all published indexes under `vectors_dir`, sorted.
pub fn list_indexes(vectors_dir: &Path) -> AppResult<Vec<String>> {
    if !vectors_dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(vectors_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with('.') && entry.path().join(INDEX_FILE).exists() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Remove the index `index_name` under `vectors_dir`.
pub fn clean_index(vectors_dir: &Path, index_name: &str) -> AppResult<()> {
    validate_index_name(index_name)?;
    let dir = vectors_dir.join(index_name);
    if !dir.exists() {
        return Err(AppError::Knowledge(format!(
            "Index '{}' does not exist",
            index_name
        )));
    }

    std::fs::remove_dir_all(&dir).map_err(|e| {
        AppError::Knowledge(format!("Failed to remove index '{}': {}", index_name, e))
    })?;

    tracing::info!("Index '{}' removed", index_name);
    Ok(())
}

/// Default index name for a source file: its lower-cased stem.
pub fn index_name_for(source: &Path) -> AppResult<String> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| AppError::Knowledge(format!("Invalid source path: {:?}", source)))?;
    validate_index_name(&stem.to_lowercase())
}

fn validate_index_name(name: &str) -> AppResult<String> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid {
        return Err(AppError::InvalidInput(format!(
            "Invalid index name '{}': use letters, digits, '-', '_' or '.'",
            name
        )));
    }
    Ok(name.to_string())
}

fn write_index(
    dir: &Path,
    source: &KnowledgeSource,
    chunks: &[KnowledgeChunk],
    manifest: &IndexManifest,
) -> AppResult<()> {
    let mut conn = init_index(&dir.join(INDEX_FILE))?;
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to start transaction: {}", e)))?;

    insert_source(&tx, source)?;
    for chunk in chunks {
        insert_chunk(&tx, chunk)?;
    }
    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit index: {}", e)))?;
    drop(conn);

    write_manifest(&dir.join(MANIFEST_FILE), manifest)
}

/// Move `staging` to `target`, replacing any previous index.
///
/// Loaded snapshots are unaffected. A load racing the swap sees either the
/// old directory, the new one, or none (and degrades).
fn publish(staging: &Path, target: &Path) -> AppResult<()> {
    if target.exists() {
        let retired = target.with_file_name(format!(
            ".{}.old-{}",
            target
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            uuid::Uuid::new_v4()
        ));
        std::fs::rename(target, &retired)
            .map_err(|e| AppError::Knowledge(format!("Failed to retire previous index: {}", e)))?;
        std::fs::rename(staging, target)
            .map_err(|e| AppError::Knowledge(format!("Failed to publish index: {}", e)))?;
        if let Err(e) = std::fs::remove_dir_all(&retired) {
            tracing::warn!("Failed to remove retired index {:?}: {}", retired, e);
        }
    } else {
        std::fs::rename(staging, target)
            .map_err(|e| AppError::Knowledge(format!("Failed to publish index: {}", e)))?;
    }
    Ok(())
}
