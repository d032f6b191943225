//! Incremental trace construction.

use super::model::{RetrievalStatus, Span, SpanStatus, Trace, TraceStatus};
use crate::cost::CostEstimator;
use crate::domain::Domain;
use crate::evaluator::EvaluationOutcome;
use chrono::{DateTime, Utc};
use std::time::Instant;
use switchboard_llm::LlmUsage;
use uuid::Uuid;

/// A span that has started but not yet been recorded.
#[derive(Debug)]
pub struct OpenSpan {
    name: &'static str,
    started_at: DateTime<Utc>,
    instant: Instant,
    input: serde_json::Value,
}

impl OpenSpan {
    pub fn name(&self) -> &str {
        self.name
    }
}

/// Collects spans and lifecycle facts for one query. Consumed by
/// [`finalize`](TraceBuilder::finalize).
#[derive(Debug)]
pub struct TraceBuilder {
    id: Uuid,
    query: String,
    started_at: DateTime<Utc>,
    instant: Instant,
    domain: Option<Domain>,
    routing_fallback: bool,
    retrieval: Option<RetrievalStatus>,
    answer: Option<String>,
    evaluation: EvaluationOutcome,
    spans: Vec<Span>,
}

impl TraceBuilder {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            started_at: Utc::now(),
            instant: Instant::now(),
            domain: None,
            routing_fallback: false,
            retrieval: None,
            answer: None,
            evaluation: EvaluationOutcome::Skipped,
            spans: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn start_span(&self, name: &'static str, input: serde_json::Value) -> OpenSpan {
        OpenSpan {
            name,
            started_at: Utc::now(),
            instant: Instant::now(),
            input,
        }
    }

    /// Record a successful step.
    pub fn end_span(
        &mut self,
        span: OpenSpan,
        output: serde_json::Value,
        model: Option<&str>,
        usage: Option<LlmUsage>,
    ) {
        self.push(span, output, model, usage, SpanStatus::Ok);
    }

    /// Record a failed step. `usage` is set when the model answered but
    /// the answer was unusable.
    pub fn fail_span(
        &mut self,
        span: OpenSpan,
        message: impl Into<String>,
        model: Option<&str>,
        usage: Option<LlmUsage>,
    ) {
        let message = message.into();
        self.push(
            span,
            serde_json::Value::Null,
            model,
            usage,
            SpanStatus::Error { message },
        );
    }

    fn push(
        &mut self,
        span: OpenSpan,
        output: serde_json::Value,
        model: Option<&str>,
        usage: Option<LlmUsage>,
        status: SpanStatus,
    ) {
        self.spans.push(Span {
            name: span.name.to_string(),
            started_at: span.started_at,
            latency_ms: span.instant.elapsed().as_millis() as u64,
            input: span.input,
            output,
            model: model.map(str::to_string),
            usage,
            status,
        });
    }

    pub fn set_route(&mut self, domain: Domain, fallback: bool) {
        self.domain = Some(domain);
        self.routing_fallback = fallback;
    }

    pub fn set_retrieval(&mut self, status: RetrievalStatus) {
        self.retrieval = Some(status);
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = Some(answer.into());
    }

    pub fn set_evaluation(&mut self, outcome: EvaluationOutcome) {
        self.evaluation = outcome;
    }

    /// Freeze the trace. Token totals and cost are derived from the spans.
    pub fn finalize(self, status: TraceStatus, costs: &CostEstimator) -> Trace {
        let usage = self
            .spans
            .iter()
            .filter_map(|s| s.usage)
            .fold(LlmUsage::default(), |acc, u| acc + u);
        let cost = costs.estimate(&self.spans);
        let latency_ms = self.instant.elapsed().as_millis() as u64;

        Trace {
            id: self.id,
            query: self.query,
            started_at: self.started_at,
            ended_at: self.started_at + chrono::Duration::milliseconds(latency_ms as i64),
            latency_ms,
            domain: self.domain,
            routing_fallback: self.routing_fallback,
            retrieval: self.retrieval,
            answer: self.answer,
            spans: self.spans,
            usage,
            cost,
            evaluation: self.evaluation,
            status,
        }
    }
}
