//! Embedding provider implementations.

pub mod hashed;
pub mod ollama;
pub mod openai;

pub use hashed::HashedProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
