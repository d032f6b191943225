//! Langfuse ingestion sink.
//!
//! Each trace becomes one batch on `POST {host}/api/public/ingestion`:
//! a `trace-create` event, one `generation-create` per model-calling span
//! (`span-create` for the rest) and a `score-create` named
//! `rag_quality_score` when the answer was scored.

use super::model::{Span, SpanStatus, Trace, TraceStatus};
use super::sink::TraceSink;
use crate::evaluator::EvaluationOutcome;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use switchboard_core::{AppError, AppResult};
use uuid::Uuid;

pub const SCORE_NAME: &str = "rag_quality_score";

pub struct LangfuseSink {
    client: Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl LangfuseSink {
    pub fn new(
        host: &str,
        public_key: String,
        secret_key: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Trace(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            public_key,
            secret_key,
        })
    }
}

impl std::fmt::Debug for LangfuseSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LangfuseSink")
            .field("host", &self.host)
            .field("public_key", &self.public_key)
            .finish()
    }
}

fn event(kind: &str, timestamp: &str, body: Value) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "type": kind,
        "timestamp": timestamp,
        "body": body,
    })
}

fn span_event(trace_id: &str, span: &Span) -> Value {
    let level = match &span.status {
        SpanStatus::Ok => json!({"level": "DEFAULT"}),
        SpanStatus::Error { message } => json!({"level": "ERROR", "statusMessage": message}),
    };

    let mut body = json!({
        "id": Uuid::new_v4().to_string(),
        "traceId": trace_id,
        "name": span.name,
        "startTime": span.started_at.to_rfc3339(),
        "endTime": span.ended_at().to_rfc3339(),
        "input": span.input,
        "output": span.output,
    });
    if let (Some(obj), Some(extra)) = (body.as_object_mut(), level.as_object()) {
        obj.extend(extra.clone());
    }

    match &span.model {
        Some(model) => {
            body["model"] = json!(model);
            if let Some(usage) = &span.usage {
                body["usage"] = json!({
                    "input": usage.prompt_tokens,
                    "output": usage.completion_tokens,
                    "total": usage.total_tokens,
                    "unit": "TOKENS",
                });
            }
            event("generation-create", &span.started_at.to_rfc3339(), body)
        }
        None => event("span-create", &span.started_at.to_rfc3339(), body),
    }
}

/// The ingestion batch for one trace.
pub fn ingestion_batch(trace: &Trace) -> Value {
    let trace_id = trace.id.to_string();
    let timestamp = trace.started_at.to_rfc3339();

    let mut tags = Vec::new();
    if let Some(domain) = trace.domain {
        tags.push(domain.as_str().to_string());
    }
    if trace.routing_fallback {
        tags.push("routing-fallback".to_string());
    }
    if trace.retrieval.as_ref().is_some_and(|r| r.is_degraded()) {
        tags.push("degraded".to_string());
    }

    let error = match &trace.status {
        TraceStatus::Ok => Value::Null,
        TraceStatus::Error { message } => json!(message),
    };

    let mut batch = vec![event(
        "trace-create",
        &timestamp,
        json!({
            "id": trace_id,
            "name": "query",
            "timestamp": timestamp,
            "input": trace.query,
            "output": trace.answer,
            "tags": tags,
            "metadata": {
                "domain": trace.domain,
                "routingFallback": trace.routing_fallback,
                "retrieval": trace.retrieval,
                "latencyMs": trace.latency_ms,
                "costUsd": trace.cost.usd,
                "costKnown": trace.cost.known,
                "error": error,
            },
        }),
    )];

    batch.extend(trace.spans.iter().map(|span| span_event(&trace_id, span)));

    if let EvaluationOutcome::Scored(record) = &trace.evaluation {
        batch.push(event(
            "score-create",
            &trace.ended_at.to_rfc3339(),
            json!({
                "id": Uuid::new_v4().to_string(),
                "traceId": trace_id,
                "name": SCORE_NAME,
                "value": record.score,
                "comment": record.reasoning,
            }),
        ));
    }

    json!({ "batch": batch })
}

#[async_trait::async_trait]
impl TraceSink for LangfuseSink {
    fn name(&self) -> &str {
        "langfuse"
    }

    async fn emit(&self, trace: &Trace) -> AppResult<()> {
        let url = format!("{}/api/public/ingestion", self.host);
        tracing::debug!("Sending trace {} to {}", trace.id, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&ingestion_batch(trace))
            .send()
            .await
            .map_err(|e| AppError::Trace(format!("Failed to send trace to Langfuse: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Trace(format!(
                "Langfuse ingestion error ({}): {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::CostEstimator;
    use crate::domain::Domain;
    use crate::evaluator::EvaluationRecord;
    use crate::trace::TraceBuilder;
    use switchboard_llm::LlmUsage;

    fn scored_trace() -> Trace {
        let mut builder = TraceBuilder::new("How do I submit an expense report?");
        let route = builder.start_span("route", json!({"query": "expense"}));
        builder.end_span(route, json!({"label": "FinanceAgent"}), Some("gpt-4"), Some(LlmUsage::new(40, 3)));
        let retrieval = builder.start_span("retrieval", json!({"top_k": 3}));
        builder.end_span(retrieval, json!({"chunks": []}), None, None);
        builder.set_route(Domain::Finance, false);
        builder.set_evaluation(EvaluationOutcome::Scored(EvaluationRecord {
            score: 8,
            raw_score: 8.0,
            reasoning: "Accurate".to_string(),
        }));
        builder.finalize(TraceStatus::Ok, &CostEstimator::default())
    }

    #[test]
    fn test_batch_shape() {
        let trace = scored_trace();
        let batch = ingestion_batch(&trace);
        let events = batch["batch"].as_array().unwrap();

        let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(
            kinds,
            vec!["trace-create", "generation-create", "span-create", "score-create"]
        );
        assert_eq!(events[0]["body"]["id"], trace.id.to_string());
        assert_eq!(events[1]["body"]["usage"]["total"], 43);
        assert_eq!(events[3]["body"]["name"], SCORE_NAME);
        assert_eq!(events[3]["body"]["value"], 8);
        assert_eq!(events[3]["body"]["traceId"], trace.id.to_string());
    }

    #[test]
    fn test_unscored_trace_has_no_score_event() {
        let trace = TraceBuilder::new("q").finalize(TraceStatus::Ok, &CostEstimator::default());
        let batch = ingestion_batch(&trace);
        let events = batch["batch"].as_array().unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_debug_hides_secret() {
        let sink = LangfuseSink::new(
            "https://cloud.langfuse.com/",
            "pk-lf".to_string(),
            "sk-lf-secret".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{:?}", sink).contains("sk-lf-secret"));
        assert_eq!(sink.host, "https://cloud.langfuse.com");
    }
}
