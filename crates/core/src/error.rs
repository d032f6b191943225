//! Error types for Switchboard.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, model calls, knowledge indexes,
//! prompts, routing, evaluation and trace emission.

use thiserror::Error;

/// Unified error type for Switchboard.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Model provider errors (classification, generation, scoring)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Similarity index and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Query classification could not produce a domain
    #[error("Routing error: {0}")]
    Routing(String),

    /// Evaluator call or score parsing failed
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Trace sink errors
    #[error("Trace error: {0}")]
    Trace(String),

    /// Caller supplied an unusable input (e.g. empty query)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_display() {
        let err = AppError::Routing("unrecognized label 'Legal'".to_string());
        assert_eq!(err.to_string(), "Routing error: unrecognized label 'Legal'");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
