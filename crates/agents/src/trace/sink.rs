//! Trace sink trait and factory.

use super::jsonl::JsonlSink;
use super::langfuse::LangfuseSink;
use super::memory::MemorySink;
use super::model::Trace;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::{AppConfig, AppError, AppResult};

/// Destination for finalized traces.
#[async_trait::async_trait]
pub trait TraceSink: Send + Sync {
    fn name(&self) -> &str;

    async fn emit(&self, trace: &Trace) -> AppResult<()>;
}

/// Writes each trace as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl TraceSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn emit(&self, trace: &Trace) -> AppResult<()> {
        let json = serde_json::to_string(trace)?;
        tracing::info!(
            trace_id = %trace.id,
            domain = ?trace.domain,
            latency_ms = trace.latency_ms,
            tokens = trace.usage.total_tokens,
            trace = %json,
            "trace"
        );
        Ok(())
    }
}

/// Discards traces.
#[derive(Debug, Default)]
pub struct NoneSink;

#[async_trait::async_trait]
impl TraceSink for NoneSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn emit(&self, _trace: &Trace) -> AppResult<()> {
        Ok(())
    }
}

/// Create the sink named by `trace.sink`.
pub fn sink_from_config(config: &AppConfig) -> AppResult<Arc<dyn TraceSink>> {
    match config.trace.sink.to_lowercase().as_str() {
        "jsonl" => Ok(Arc::new(JsonlSink::new(config.traces_dir().join("traces.jsonl")))),
        "langfuse" => {
            let public_key = config.trace.langfuse_public_key.clone().ok_or_else(|| {
                AppError::Config("Langfuse sink requires LANGFUSE_PUBLIC_KEY".to_string())
            })?;
            let secret_key = config.trace.langfuse_secret_key.clone().ok_or_else(|| {
                AppError::Config("Langfuse sink requires LANGFUSE_SECRET_KEY".to_string())
            })?;
            let sink = LangfuseSink::new(
                &config.trace.langfuse_host,
                public_key,
                secret_key,
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(Arc::new(sink))
        }
        "log" => Ok(Arc::new(LogSink)),
        "memory" => Ok(Arc::new(MemorySink::new())),
        "none" => Ok(Arc::new(NoneSink)),
        other => Err(AppError::Config(format!(
            "Unknown trace sink: '{}'. Supported sinks: jsonl, langfuse, log, memory, none",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(sink: &str) -> (TempDir, AppConfig) {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config.trace.sink = sink.to_string();
        (temp, config)
    }

    #[test]
    fn test_sink_names() {
        for name in ["jsonl", "log", "memory", "none"] {
            let (_temp, config) = config(name);
            assert_eq!(sink_from_config(&config).unwrap().name(), name);
        }
    }

    #[test]
    fn test_langfuse_requires_keys() {
        let (_temp, mut config) = config("langfuse");
        assert!(matches!(sink_from_config(&config), Err(AppError::Config(_))));

        config.trace.langfuse_public_key = Some("pk-lf".to_string());
        config.trace.langfuse_secret_key = Some("sk-lf".to_string());
        assert_eq!(sink_from_config(&config).unwrap().name(), "langfuse");
    }

    #[test]
    fn test_unknown_sink() {
        let (_temp, config) = config("kafka");
        assert!(sink_from_config(&config).is_err());
    }
}
