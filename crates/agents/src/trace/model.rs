//! Trace records emitted once per query.

use crate::domain::Domain;
use crate::evaluator::EvaluationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use switchboard_llm::LlmUsage;
use uuid::Uuid;

/// Whether the answer was generated from retrieved context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RetrievalStatus {
    Grounded,
    Degraded { reason: String },
}

impl RetrievalStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalStatus::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error { message: String },
}

/// One step of the query lifecycle (`route`, `retrieval`, `generation`,
/// `evaluation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub input: serde_json::Value,
    pub output: serde_json::Value,

    /// Model that served the step, when it called one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<LlmUsage>,

    pub status: SpanStatus,
}

impl Span {
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.started_at + chrono::Duration::milliseconds(self.latency_ms as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TraceStatus {
    Ok,
    Error { message: String },
}

/// Estimated spend for one trace.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostEstimate {
    pub usd: f64,

    /// False when any model call had no pricing entry
    pub known: bool,
}

/// Immutable record of one query, produced by
/// [`TraceBuilder::finalize`](crate::trace::TraceBuilder::finalize).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: Uuid,
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub latency_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,

    pub routing_fallback: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    pub spans: Vec<Span>,
    pub usage: LlmUsage,
    pub cost: CostEstimate,
    pub evaluation: EvaluationOutcome,
    pub status: TraceStatus,
}

impl Trace {
    pub fn span(&self, name: &str) -> Option<&Span> {
        self.spans.iter().find(|s| s.name == name)
    }

    pub fn is_ok(&self) -> bool {
        self.status == TraceStatus::Ok
    }
}
