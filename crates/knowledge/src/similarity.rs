//! In-memory similarity search over a loaded index.
//!
//! A [`SimilarityIndex`] is an immutable snapshot: it is read once from disk
//! and shared behind an `Arc`. Rebuilding an index publishes new files but
//! never mutates a snapshot that is already loaded.

use crate::index::{load_chunks, open_index, INDEX_FILE};
use crate::manifest::{read_manifest, MANIFEST_FILE};
use crate::types::{IndexManifest, KnowledgeChunk, ScoredChunk};
use std::cmp::Ordering;
use std::path::Path;
use switchboard_core::{AppError, AppResult};

#[derive(Debug, Clone)]
struct Entry {
    chunk: KnowledgeChunk,
    vector: Vec<f32>,
    norm: f32,
}

/// A loaded, read-only similarity index for one domain.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    name: String,
    manifest: IndexManifest,
    entries: Vec<Entry>,
}

impl SimilarityIndex {
    /// Load the index stored in `dir` (`index.sqlite` + `manifest.json`).
    pub fn load(dir: &Path) -> AppResult<Self> {
        let manifest = read_manifest(&dir.join(MANIFEST_FILE))?;
        let conn = open_index(&dir.join(INDEX_FILE))?;
        let chunks = load_chunks(&conn)?;

        let index = Self::from_chunks(manifest, chunks)?;
        tracing::info!(
            "Loaded index '{}' ({} chunks, {} dims)",
            index.name,
            index.len(),
            index.dimensions()
        );
        Ok(index)
    }

    /// Build an index from chunks that already carry embeddings.
    pub fn from_chunks(manifest: IndexManifest, chunks: Vec<KnowledgeChunk>) -> AppResult<Self> {
        let mut entries = Vec::with_capacity(chunks.len());

        for mut chunk in chunks {
            let vector = chunk.embedding.take().ok_or_else(|| {
                AppError::Knowledge(format!("Chunk {} has no embedding", chunk.id))
            })?;
            if vector.len() != manifest.dimensions {
                return Err(AppError::Knowledge(format!(
                    "Chunk {} has {} dimensions, index '{}' declares {}",
                    chunk.id,
                    vector.len(),
                    manifest.index_name,
                    manifest.dimensions
                )));
            }
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            entries.push(Entry {
                chunk,
                vector,
                norm,
            });
        }

        Ok(Self {
            name: manifest.index_name.clone(),
            manifest,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return at most `top_k` chunks ordered by non-increasing cosine similarity.
    ///
    /// Ties are broken by `(source_id, position)` ascending.
    pub fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        if query.len() != self.dimensions() {
            return Err(AppError::Knowledge(format!(
                "Query has {} dimensions, index '{}' expects {}",
                query.len(),
                self.name,
                self.dimensions()
            )));
        }

        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt();

        let mut scored: Vec<(&Entry, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry, cosine(query, query_norm, &entry.vector, entry.norm)))
            .collect();

        scored.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk.source_id.cmp(&b.chunk.source_id))
                .then_with(|| a.chunk.position.cmp(&b.chunk.position))
        });
        scored.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks from '{}' (requested top-{})",
            scored.len(),
            self.name,
            top_k
        );

        Ok(scored
            .into_iter()
            .map(|(entry, score)| ScoredChunk {
                id: entry.chunk.id.clone(),
                source_id: entry.chunk.source_id.clone(),
                position: entry.chunk.position,
                text: entry.chunk.text.clone(),
                score,
            })
            .collect())
    }
}

fn cosine(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn manifest(dimensions: usize) -> IndexManifest {
        IndexManifest {
            index_name: "hr".to_string(),
            embedding_provider: "hashed".to_string(),
            embedding_model: "hashed-trigram-v1".to_string(),
            dimensions,
            chunk_size: 1000,
            chunk_overlap: 200,
            chunk_count: 0,
            source_file: "HR.md".to_string(),
            built_at: Utc::now(),
        }
    }

    fn chunk(source_id: &str, position: u32, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: format!("{}#{}", source_id, position),
            source_id: source_id.to_string(),
            position,
            text: format!("{} {}", source_id, position),
            embedding: Some(embedding),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = SimilarityIndex::from_chunks(
            manifest(2),
            vec![
                chunk("a", 0, vec![0.0, 1.0]),
                chunk("a", 1, vec![1.0, 0.0]),
                chunk("a", 2, vec![0.7, 0.7]),
            ],
        )
        .unwrap();

        let results = index.search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[1].position, 2);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_ties_break_on_source_then_position() {
        let index = SimilarityIndex::from_chunks(
            manifest(2),
            vec![
                chunk("b", 0, vec![1.0, 0.0]),
                chunk("a", 3, vec![2.0, 0.0]),
                chunk("a", 1, vec![1.0, 0.0]),
            ],
        )
        .unwrap();

        let ids: Vec<String> = index
            .search(&[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["a#1", "a#3", "b#0"]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let index =
            SimilarityIndex::from_chunks(manifest(3), vec![chunk("a", 0, vec![1.0, 0.0, 0.0])])
                .unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0], 3),
            Err(AppError::Knowledge(_))
        ));

        let bad = SimilarityIndex::from_chunks(manifest(3), vec![chunk("a", 0, vec![1.0])]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = SimilarityIndex::from_chunks(manifest(2), vec![]).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }
}
