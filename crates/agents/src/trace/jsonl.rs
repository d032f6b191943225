//! Append-only JSON Lines trace log.

use super::model::Trace;
use super::sink::TraceSink;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use switchboard_core::{AppError, AppResult};

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl TraceSink for JsonlSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn emit(&self, trace: &Trace) -> AppResult<()> {
        let mut line = serde_json::to_string(trace)?;
        line.push('\n');

        // Whole lines only; concurrent queries share the file
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Trace("Trace log lock poisoned".to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Trace(format!("Failed to create trace directory: {}", e))
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Trace(format!("Failed to open {:?}: {}", self.path, e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| AppError::Trace(format!("Failed to append trace: {}", e)))?;

        tracing::debug!("Trace {} appended to {:?}", trace.id, self.path);
        Ok(())
    }
}
