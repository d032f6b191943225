//! LLM integration crate for Switchboard.
//!
//! This crate provides a provider-agnostic abstraction for the three model
//! capabilities the router needs: tool-calling classification, grounded
//! answer generation, and JSON-mode scoring.
//!
//! # Providers
//! - **OpenAI**: any OpenAI-compatible chat completions endpoint (default)
//! - **Ollama**: local LLM runtime
//! - **Mock**: closure-scripted client for tests
//!
//! # Example
//! ```no_run
//! use switchboard_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage, ToolCall, ToolSpec};
pub use factory::{client_from_config, create_client};
pub use providers::{MockClient, OllamaClient, OpenAiClient};
pub use types::{ClientOptions, ProviderType};
