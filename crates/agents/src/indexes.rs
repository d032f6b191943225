//! Lazily loaded, shared similarity indexes.

use crate::domain::Domain;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use switchboard_core::{AppError, AppResult};
use switchboard_knowledge::SimilarityIndex;

/// One immutable snapshot per domain, loaded on first use.
///
/// Load failures are not cached; the next query retries the load.
#[derive(Debug)]
pub struct IndexCache {
    vectors_dir: PathBuf,
    loaded: RwLock<HashMap<Domain, Arc<SimilarityIndex>>>,
}

impl IndexCache {
    pub fn new(vectors_dir: impl Into<PathBuf>) -> Self {
        Self {
            vectors_dir: vectors_dir.into(),
            loaded: RwLock::new(HashMap::new()),
        }
    }

    pub fn vectors_dir(&self) -> &Path {
        &self.vectors_dir
    }

    pub fn get(&self, domain: Domain) -> AppResult<Arc<SimilarityIndex>> {
        if let Some(index) = self.read()?.get(&domain) {
            return Ok(Arc::clone(index));
        }

        let dir = self.vectors_dir.join(domain.index_name());
        let index = Arc::new(SimilarityIndex::load(&dir)?);

        let mut loaded = self.write()?;
        // Another query may have loaded it meanwhile; keep the first
        let entry = loaded.entry(domain).or_insert(index);
        Ok(Arc::clone(entry))
    }

    /// Drop every cached snapshot so the next query loads the published files.
    /// Snapshots held by in-flight queries stay valid.
    pub fn reload(&self) -> AppResult<()> {
        self.write()?.clear();
        tracing::info!("Index cache cleared");
        Ok(())
    }

    fn read(
        &self,
    ) -> AppResult<std::sync::RwLockReadGuard<'_, HashMap<Domain, Arc<SimilarityIndex>>>> {
        self.loaded
            .read()
            .map_err(|_| AppError::Other("Index cache lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> AppResult<std::sync::RwLockWriteGuard<'_, HashMap<Domain, Arc<SimilarityIndex>>>> {
        self.loaded
            .write()
            .map_err(|_| AppError::Other("Index cache lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use switchboard_knowledge::embeddings::providers::HashedProvider;
    use switchboard_knowledge::IndexBuilder;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_index_is_an_error_not_cached() {
        let temp = TempDir::new().unwrap();
        let cache = IndexCache::new(temp.path().join("vectors"));
        assert!(cache.get(Domain::Hr).is_err());

        let source = temp.path().join("HR.md");
        std::fs::write(&source, "Sick leave requires a doctor's note after three days.").unwrap();
        IndexBuilder::new(cache.vectors_dir(), Arc::new(HashedProvider::new(32)), 100, 10, 8)
            .build(&source, None)
            .await
            .unwrap();

        let first = cache.get(Domain::Hr).unwrap();
        let second = cache.get(Domain::Hr).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let temp = TempDir::new().unwrap();
        let cache = IndexCache::new(temp.path().join("vectors"));
        let builder = IndexBuilder::new(cache.vectors_dir(), Arc::new(HashedProvider::new(32)), 40, 10, 8);

        let source = temp.path().join("Tech.md");
        std::fs::write(&source, "Reboot the router.").unwrap();
        builder.build(&source, None).await.unwrap();
        let before = cache.get(Domain::Tech).unwrap();

        std::fs::write(&source, "Reboot the router. Then reinstall the VPN client and sign in again.").unwrap();
        builder.build(&source, None).await.unwrap();

        // Held snapshot is unchanged until reload
        assert_eq!(cache.get(Domain::Tech).unwrap().len(), before.len());
        cache.reload().unwrap();
        let after = cache.get(Domain::Tech).unwrap();
        assert!(after.len() > before.len());
        assert_eq!(before.len(), 1);
    }
}
