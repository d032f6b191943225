//! Embedding provider trait and factory.

use super::providers::{HashedProvider, OllamaEmbeddingProvider, OpenAiEmbeddingProvider};
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::config::EmbeddingSettings;
use switchboard_core::{AppConfig, AppError, AppResult};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "hashed", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}

/// Transport settings for remote embedding providers.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingOptions {
    pub api_key: Option<String>,

    /// Fallback base URL when `embedding.endpoint` is unset
    pub base_url: Option<String>,

    pub timeout: Option<Duration>,

    /// Ollama only
    pub use_gpu: bool,
}

/// Create an embedding provider from embedding settings.
pub fn create_provider(
    settings: &EmbeddingSettings,
    options: EmbeddingOptions,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let timeout = options.timeout.unwrap_or(Duration::from_secs(60));
    let base_url = settings.endpoint.clone().or(options.base_url);

    match settings.provider.to_lowercase().as_str() {
        "hashed" => Ok(Arc::new(HashedProvider::new(settings.dimensions))),

        "ollama" => {
            let provider = OllamaEmbeddingProvider::new(
                base_url.as_deref(),
                &settings.model,
                settings.dimensions,
                timeout,
            )?
            .with_gpu(options.use_gpu);
            Ok(Arc::new(provider))
        }

        "openai" => {
            let api_key = options.api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            let provider = OpenAiEmbeddingProvider::new(
                base_url.as_deref(),
                &api_key,
                &settings.model,
                settings.dimensions,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: hashed, openai, ollama",
            settings.provider
        ))),
    }
}

/// Create the embedding provider described by the application config.
///
/// The generation endpoint is reused as base URL when both sides use the
/// same provider and `embedding.endpoint` is unset.
pub fn provider_from_config(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let same_provider = config.provider.eq_ignore_ascii_case(&config.embedding.provider);
    let options = EmbeddingOptions {
        api_key: config.api_key.clone(),
        base_url: if same_provider {
            config.endpoint.clone()
        } else {
            None
        },
        timeout: Some(Duration::from_secs(config.request_timeout_secs)),
        use_gpu: config.use_gpu,
    };
    create_provider(&config.embedding, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            model: "test-model".to_string(),
            dimensions: 128,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_hashed_provider() {
        let provider = create_provider(&settings("hashed"), EmbeddingOptions::default()).unwrap();
        assert_eq!(provider.provider_name(), "hashed");
        assert_eq!(provider.dimensions(), 128);
    }

    #[test]
    fn test_create_ollama_provider_without_network() {
        let provider = create_provider(&settings("ollama"), EmbeddingOptions::default()).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "test-model");
    }

    #[test]
    fn test_openai_requires_key() {
        let result = create_provider(&settings("openai"), EmbeddingOptions::default());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&settings("unknown"), EmbeddingOptions::default());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("hashed"), EmbeddingOptions::default()).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 128);
    }
}
