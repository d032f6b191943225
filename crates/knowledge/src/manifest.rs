//! `manifest.json` read/write.

use crate::types::IndexManifest;
use std::path::Path;
use switchboard_core::{AppError, AppResult};

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn read_manifest(path: &Path) -> AppResult<IndexManifest> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read manifest {:?}: {}", path, e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| AppError::Knowledge(format!("Failed to parse manifest {:?}: {}", path, e)))
}

pub fn write_manifest(path: &Path, manifest: &IndexManifest) -> AppResult<()> {
    let json = serde_json::to_string_pretty(manifest)?;
    std::fs::write(path, json)
        .map_err(|e| AppError::Knowledge(format!("Failed to write manifest {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_uses_camel_case() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        let manifest = IndexManifest {
            index_name: "finance".to_string(),
            embedding_provider: "ollama".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            chunk_size: 1000,
            chunk_overlap: 200,
            chunk_count: 12,
            source_file: "Finance.md".to_string(),
            built_at: Utc::now(),
        };

        write_manifest(&path, &manifest).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"embeddingModel\""));
        assert_eq!(read_manifest(&path).unwrap(), manifest);
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        assert!(read_manifest(&temp.path().join(MANIFEST_FILE)).is_err());
    }
}
