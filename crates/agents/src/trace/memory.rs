use super::model::Trace;
use super::sink::TraceSink;
use std::sync::Mutex;
use switchboard_core::{AppError, AppResult};

/// Keeps traces in process. Used by tests and the validation harness.
#[derive(Debug, Default)]
pub struct MemorySink {
    traces: Mutex<Vec<Trace>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn traces(&self) -> Vec<Trace> {
        self.traces
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.traces.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl TraceSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn emit(&self, trace: &Trace) -> AppResult<()> {
        self.traces
            .lock()
            .map_err(|_| AppError::Trace("Memory sink lock poisoned".to_string()))?
            .push(trace.clone());
        Ok(())
    }
}
