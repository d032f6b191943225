//! LLM provider factory.
//!
//! This module creates LLM clients from application configuration. It
//! handles provider resolution, secret checks and transport options.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::{ClientOptions, ProviderType};
use std::sync::Arc;
use switchboard_core::{AppConfig, AppError, AppResult};

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (for providers that require it)
/// * `options` - Timeout and GPU settings
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    options: ClientOptions,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(crate::providers::ollama::DEFAULT_OLLAMA_URL);
            let client = OllamaClient::with_base_url(base_url)
                .with_timeout(options.timeout)
                .with_gpu(options.use_gpu);
            Ok(Arc::new(client))
        }
        ProviderType::OpenAI => {
            let api_key = api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| "OpenAI provider requires API key".to_string())?;
            let base_url = endpoint.unwrap_or(crate::providers::openai::DEFAULT_OPENAI_URL);
            let client = OpenAiClient::with_base_url(base_url, api_key).with_timeout(options.timeout);
            Ok(Arc::new(client))
        }
    }
}

/// Create the configured client, mapping failures to `AppError::Config`.
pub fn client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let options = ClientOptions {
        timeout: std::time::Duration::from_secs(config.request_timeout_secs),
        use_gpu: config.use_gpu,
    };

    create_client(
        &config.provider,
        config.endpoint.as_deref(),
        config.api_key.as_deref(),
        options,
    )
    .map_err(AppError::Config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, ClientOptions::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client(
            "ollama",
            Some("http://localhost:8080"),
            None,
            ClientOptions::default(),
        )
        .unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, ClientOptions::default()) {
            Err(err) => assert!(err.contains("OpenAI provider requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_openai_with_key() {
        let client = create_client("openai", None, Some("sk-test"), ClientOptions::default()).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, ClientOptions::default()) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }

    #[test]
    fn test_client_from_config_maps_to_config_error() {
        let mut config = AppConfig::default();
        config.provider = "openai".to_string();
        config.api_key = None;

        let result = client_from_config(&config);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
