//! Embedding providers for indexes and queries.
//!
//! One provider is configured per process (`embedding.*` settings) and is
//! shared by the index builder and every domain agent, so chunks and queries
//! always land in the same vector space.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, provider_from_config, EmbeddingOptions, EmbeddingProvider};

use switchboard_core::{AppError, AppResult};

/// Embed `texts` in batches of at most `batch_size`, preserving order.
///
/// Every returned vector is checked against the provider's dimensions.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut embeddings = Vec::with_capacity(texts.len());

    for (batch_no, batch) in texts.chunks(batch_size).enumerate() {
        tracing::debug!(
            "Embedding batch {} ({} texts) with {}/{}",
            batch_no,
            batch.len(),
            provider.provider_name(),
            provider.model_name()
        );

        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        for vector in &vectors {
            check_dimensions(provider, vector)?;
        }
        embeddings.extend(vectors);
    }

    Ok(embeddings)
}

fn check_dimensions(provider: &dyn EmbeddingProvider, vector: &[f32]) -> AppResult<()> {
    if vector.len() != provider.dimensions() {
        return Err(AppError::Knowledge(format!(
            "Embedding model '{}' returned {} dimensions, expected {}",
            provider.model_name(),
            vector.len(),
            provider.dimensions()
        )));
    }
    Ok(())
}
