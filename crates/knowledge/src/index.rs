//! SQLite persistence for similarity indexes.

use crate::types::{KnowledgeChunk, KnowledgeSource};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use switchboard_core::{AppError, AppResult};

/// File name of the SQLite database inside an index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Create (or open) an index database for writing.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            path TEXT,
            content_type TEXT NOT NULL,
            learned_at TEXT NOT NULL,
            size_bytes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            FOREIGN KEY (source_id) REFERENCES sources(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id, position);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open an existing index database read-only.
pub fn open_index(db_path: &Path) -> AppResult<Connection> {
    if !db_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Index file not found: {:?}",
            db_path
        )));
    }

    Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, content_type, learned_at, size_bytes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            source.id,
            source
                .path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            source.content_type,
            source.learned_at.to_rfc3339(),
            source.size_bytes as i64,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding_bytes = embedding_to_bytes(
        chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?,
    );

    let metadata_json = serde_json::to_string(&chunk.metadata)
        .map_err(|e| AppError::Knowledge(format!("Failed to serialize metadata: {}", e)))?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.text,
            embedding_bytes,
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Load every chunk with its embedding, ordered by `(source_id, position)`.
pub fn load_chunks(conn: &Connection) -> AppResult<Vec<KnowledgeChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, position, text, embedding, metadata
             FROM chunks ORDER BY source_id, position",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(4)?;
            let metadata_json: Option<String> = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                embedding_bytes,
                metadata_json,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut chunks = Vec::new();
    for row in rows {
        let (id, source_id, position, text, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk row: {}", e)))?;

        let metadata = match metadata_json {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                AppError::Knowledge(format!("Corrupt metadata for chunk {}: {}", id, e))
            })?,
            None => serde_json::Value::Null,
        };

        chunks.push(KnowledgeChunk {
            embedding: Some(bytes_to_embedding(&embedding_bytes)?),
            id,
            source_id,
            position: position as u32,
            text,
            metadata,
        });
    }

    Ok(chunks)
}

/// Get (sources, chunks) counts for the index.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

/// Convert embedding vector to little-endian bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn source(id: &str) -> KnowledgeSource {
        KnowledgeSource {
            id: id.to_string(),
            path: None,
            content_type: "text".to_string(),
            learned_at: Utc::now(),
            size_bytes: 100,
        }
    }

    fn chunk(source_id: &str, position: u32, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: format!("{}#{}", source_id, position),
            source_id: source_id.to_string(),
            position,
            text: format!("text {}", position),
            embedding: Some(embedding),
            metadata: serde_json::json!({"char_start": 0, "char_end": 6}),
        }
    }

    #[test]
    fn test_init_index_creates_tables() {
        let temp = TempDir::new().unwrap();
        let conn = init_index(&temp.path().join("nested").join(INDEX_FILE)).unwrap();

        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_count >= 2);
    }

    #[test]
    fn test_insert_and_load_in_position_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(INDEX_FILE);
        let conn = init_index(&path).unwrap();

        insert_source(&conn, &source("HR.md")).unwrap();
        insert_chunk(&conn, &chunk("HR.md", 1, vec![0.0, 1.0])).unwrap();
        insert_chunk(&conn, &chunk("HR.md", 0, vec![1.0, 0.0])).unwrap();
        drop(conn);

        let conn = open_index(&path).unwrap();
        let chunks = load_chunks(&conn).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].embedding, Some(vec![1.0, 0.0]));
        assert_eq!(chunks[1].metadata["char_end"], 6);

        assert_eq!(get_stats(&conn).unwrap(), (1, 2));
    }

    #[test]
    fn test_open_missing_index() {
        let temp = TempDir::new().unwrap();
        let result = open_index(&temp.path().join(INDEX_FILE));
        assert!(matches!(result, Err(AppError::Knowledge(_))));
    }

    #[test]
    fn test_embedding_bytes_reject_bad_length() {
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
        let bytes = embedding_to_bytes(&[0.5, -2.0]);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), vec![0.5, -2.0]);
    }
}
