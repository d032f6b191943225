//! LLM-as-judge answer scoring.
//!
//! The judge is asked for a JSON object `{"score": <0-10>, "reasoning": ".."}`.
//! Anything that does not parse into a score inside `[0, 10]` becomes
//! [`EvaluationOutcome::Failed`]; a number is never made up.

use crate::trace::TraceBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{AppConfig, AppResult};
use switchboard_llm::{LlmClient, LlmRequest};
use switchboard_prompt::{build_prompt, load_prompt, PromptDefinition};

pub const EVALUATOR_PROMPT: &str = "evaluator.score";

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// `raw_score` rounded half away from zero
    pub score: u8,
    pub raw_score: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EvaluationOutcome {
    Scored(EvaluationRecord),
    Failed { reason: String },
    /// Evaluation disabled or not requested
    Skipped,
}

impl EvaluationOutcome {
    pub fn score(&self) -> Option<u8> {
        match self {
            EvaluationOutcome::Scored(record) => Some(record.score),
            _ => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, EvaluationOutcome::Scored(_))
    }
}

pub struct Evaluator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    max_tokens: u32,
    enabled: bool,
}

impl Evaluator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        prompt: PromptDefinition,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            max_tokens,
            enabled: true,
        }
    }

    pub fn from_config(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let prompt = load_prompt(&config.workspace, EVALUATOR_PROMPT)?;
        Ok(Self::new(
            client,
            config.evaluator_model(),
            prompt,
            config.evaluation.max_tokens,
        )
        .with_enabled(config.evaluation.enabled))
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub async fn score(&self, query: &str, response: &str) -> EvaluationOutcome {
        self.score_with_context(query, response, "").await
    }

    /// Score with reference material (retrieved chunks or an expected answer).
    pub async fn score_with_context(
        &self,
        query: &str,
        response: &str,
        context: &str,
    ) -> EvaluationOutcome {
        let mut trace = TraceBuilder::new(query);
        self.score_traced(query, response, context, &mut trace).await
    }

    /// Score and record an `evaluation` span into `trace`.
    pub async fn score_traced(
        &self,
        query: &str,
        response: &str,
        context: &str,
        trace: &mut TraceBuilder,
    ) -> EvaluationOutcome {
        if !self.enabled {
            return EvaluationOutcome::Skipped;
        }

        let span = trace.start_span(
            "evaluation",
            json!({
                "query": query,
                "response": response,
                "has_context": !context.trim().is_empty(),
            }),
        );

        let variables = HashMap::from([
            ("query".to_string(), query.to_string()),
            ("response".to_string(), response.to_string()),
            ("context".to_string(), context.trim().to_string()),
        ]);
        let built = match build_prompt(&self.prompt, variables) {
            Ok(built) => built,
            Err(e) => {
                let reason = e.to_string();
                trace.fail_span(span, reason.clone(), None, None);
                return EvaluationOutcome::Failed { reason };
            }
        };

        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(0.0)
            .with_max_tokens(self.max_tokens)
            .with_json_mode();
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let completion = match self.client.complete(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                let reason = format!("Evaluator call failed: {}", e);
                tracing::warn!("{}", reason);
                trace.fail_span(span, reason.clone(), Some(&self.model), None);
                return EvaluationOutcome::Failed { reason };
            }
        };

        match parse_judgement(&completion.content) {
            Ok(record) => {
                tracing::info!("Answer scored {} ({:.2})", record.score, record.raw_score);
                trace.end_span(
                    span,
                    json!({
                        "score": record.score,
                        "raw_score": record.raw_score,
                        "reasoning": record.reasoning,
                    }),
                    Some(&completion.model),
                    Some(completion.usage),
                );
                EvaluationOutcome::Scored(record)
            }
            Err(reason) => {
                tracing::warn!("Unusable evaluator output: {}", reason);
                tracing::debug!("Evaluator output: {}", completion.content);
                trace.fail_span(span, reason.clone(), Some(&completion.model), Some(completion.usage));
                EvaluationOutcome::Failed { reason }
            }
        }
    }
}

/// Parse the first JSON object in `output` that carries a score into a record.
pub fn parse_judgement(output: &str) -> Result<EvaluationRecord, String> {
    let value = scored_json_object(output)?;

    let raw_score = match value.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
        None => return Err("evaluator output has no 'score' field".to_string()),
    }
    .ok_or_else(|| format!("score is not a number: {}", value["score"]))?;

    if !raw_score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&raw_score) {
        return Err(format!(
            "score {} is outside [{}, {}]",
            raw_score, MIN_SCORE, MAX_SCORE
        ));
    }

    let reasoning = value
        .get("reasoning")
        .and_then(Value::as_str)
        .ok_or_else(|| "evaluator output has no 'reasoning' text".to_string())?
        .trim()
        .to_string();

    Ok(EvaluationRecord {
        score: round_score(raw_score),
        raw_score,
        reasoning,
    })
}

/// Round half away from zero. Callers guarantee `raw` is within range.
pub fn round_score(raw: f64) -> u8 {
    raw.round().clamp(MIN_SCORE, MAX_SCORE) as u8
}

/// Slice of the first balanced `{...}`, ignoring braces inside strings.
/// First balanced JSON object in `text` that carries a `score` key. Models
/// sometimes echo braces from the prompt before the verdict.
fn scored_json_object(text: &str) -> Result<Value, String> {
    let mut parse_error = None;
    let mut saw_object = false;

    for (start, _) in text.match_indices('{') {
        let Some(candidate) = balanced_object(&text[start..]) else {
            continue;
        };
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) if value.get("score").is_some() => return Ok(value),
            Ok(value) => saw_object |= value.is_object(),
            Err(e) => {
                parse_error.get_or_insert(e);
            }
        }
    }

    if saw_object {
        return Err("evaluator output has no 'score' field".to_string());
    }
    match parse_error {
        Some(e) => Err(format!("evaluator output is not valid JSON: {}", e)),
        None => Err("no JSON object in evaluator output".to_string()),
    }
}

/// The brace-balanced prefix of `text`, which must start with `{`.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
