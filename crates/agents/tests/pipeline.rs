//! End-to-end scenarios with scripted models and the hashed embedder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use switchboard_agents::evaluator::{Evaluator, EVALUATOR_PROMPT};
use switchboard_agents::trace::{MemorySink, TraceSink, TraceStatus};
use switchboard_agents::{
    load_cases, validate, Domain, EvaluationOutcome, Pipeline, PipelineClients, RetrievalStatus,
    Trace, ValidationOptions,
};
use switchboard_core::config::RoutingFailurePolicy;
use switchboard_core::{AppConfig, AppError, AppResult};
use switchboard_knowledge::{create_provider, EmbeddingOptions, EmbeddingProvider, IndexBuilder};
use switchboard_llm::{LlmRequest, LlmResponse, LlmUsage, MockClient};
use tempfile::TempDir;

const FINANCE: &[&str] = &[
    "expense", "budget", "invoice", "reimbursement", "purchase order", "vendor", "corporate card",
    "per diem",
];
const TECH: &[&str] = &[
    "laptop", "vpn", "password", "printer", "print job", "software", "wifi", "email",
];
const HR: &[&str] = &[
    "leave", "vacation", "sick", "benefit", "enrollment", "retirement", "payroll", "payslip",
    "remote work", "harassment",
];

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Keyword classifier, grounded answerer and context-sensitive judge in one.
fn scripted(request: &LlmRequest) -> AppResult<LlmResponse> {
    let usage = LlmUsage::new(50, 10);

    if request.require_tool {
        let query = request.prompt.to_lowercase();
        let tool = [("FinanceAgent", FINANCE), ("TechAgent", TECH), ("HRAgent", HR)]
            .into_iter()
            .find(|(_, keywords)| keywords.iter().any(|k| query.contains(k)))
            .map(|(tool, _)| tool);
        return Ok(match tool {
            Some(tool) => LlmResponse::tool_call(tool, r#"{"query": "..."}"#, request.model.clone()),
            None => LlmResponse::text("Unknown", request.model.clone()),
        }
        .with_usage(usage));
    }

    if request.json_mode {
        let judgement = if request.prompt.contains("Reference material") {
            r#"{"score": 8.5, "reasoning": "Relevant and consistent with the reference."}"#
        } else {
            r#"{"score": 4, "reasoning": "No reference material to confirm the answer."}"#
        };
        return Ok(LlmResponse::text(judgement, request.model.clone()).with_usage(usage));
    }

    let answer = if request.prompt.contains("Reference material") {
        "According to the handbook, use the portal described in the policy."
    } else {
        "Please contact the responsible team for details."
    };
    Ok(LlmResponse::text(answer, request.model.clone()).with_usage(usage))
}

struct Harness {
    temp: TempDir,
    config: AppConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    client: Arc<MockClient>,
    sink: Arc<MemorySink>,
}

impl Harness {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.workspace = temp.path().to_path_buf();
        config.model = "gpt-4".to_string();
        config.embedding.provider = "hashed".to_string();
        config.embedding.dimensions = 128;
        config.retrieval.chunk_size = 300;
        config.retrieval.chunk_overlap = 60;
        config.trace.sink = "memory".to_string();

        let embedder = create_provider(&config.embedding, EmbeddingOptions::default()).unwrap();

        Self {
            temp,
            config,
            embedder,
            client: Arc::new(MockClient::new(scripted)),
            sink: Arc::new(MemorySink::new()),
        }
    }

    async fn build(&self, file: &str) {
        IndexBuilder::from_config(&self.config, Arc::clone(&self.embedder))
            .build(&repo_root().join("data").join(file), None)
            .await
            .unwrap();
    }

    async fn build_all(&self) {
        for file in ["HR.md", "Tech.md", "Finance.md"] {
            self.build(file).await;
        }
    }

    fn pipeline(&self) -> Pipeline {
        let clients = PipelineClients::shared(self.client.clone(), Arc::clone(&self.embedder));
        Pipeline::new(&self.config, clients, self.sink.clone()).unwrap()
    }

    fn last_trace(&self) -> Trace {
        self.sink.traces().pop().unwrap()
    }
}

#[tokio::test]
async fn parental_leave_is_answered_by_hr_from_the_handbook() {
    let harness = Harness::new();
    harness.build_all().await;
    let pipeline = harness.pipeline();

    let outcome = pipeline.handle("How do I apply for parental leave?").await.unwrap();

    assert_eq!(outcome.route.domain, Domain::Hr);
    assert!(!outcome.route.fallback);
    assert_eq!(outcome.retrieval, RetrievalStatus::Grounded);
    assert!(outcome.response.grounded);
    assert!(!outcome.response.chunks.is_empty() && outcome.response.chunks.len() <= 3);
    assert!(outcome
        .response
        .chunks
        .iter()
        .any(|c| c.text.to_lowercase().contains("parental leave")));
    assert_eq!(outcome.evaluation.score(), Some(9));

    // route, generation, evaluation
    assert_eq!(harness.client.call_count(), 3);

    let trace = harness.last_trace();
    assert_eq!(trace.id, outcome.trace_id);
    assert!(trace.is_ok());
    let names: Vec<&str> = trace.spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["route", "retrieval", "generation", "evaluation"]);
    assert_eq!(trace.usage.total_tokens, 180);
    assert!(trace.cost.known && trace.cost.usd > 0.0);
}

#[tokio::test]
async fn empty_hr_index_degrades_to_an_ungrounded_answer() {
    let harness = Harness::new();
    let empty = harness.temp.path().join("HR.md");
    std::fs::write(&empty, "   \n\n").unwrap();
    IndexBuilder::from_config(&harness.config, Arc::clone(&harness.embedder))
        .build(&empty, None)
        .await
        .unwrap();

    let outcome = harness
        .pipeline()
        .handle("What is the vacation policy?")
        .await
        .unwrap();

    assert_eq!(outcome.route.domain, Domain::Hr);
    assert!(outcome.retrieval.is_degraded());
    assert!(!outcome.response.grounded);
    assert!(outcome.response.chunks.is_empty());
    assert!(!outcome.response.answer.is_empty());

    let trace = harness.last_trace();
    assert!(matches!(trace.retrieval, Some(RetrievalStatus::Degraded { .. })));
    assert_eq!(trace.span("retrieval").unwrap().output["degraded"], true);
}

#[tokio::test]
async fn missing_index_also_degrades() {
    let harness = Harness::new();
    harness.build("HR.md").await;

    let outcome = harness.pipeline().handle("My VPN keeps disconnecting").await.unwrap();
    assert_eq!(outcome.route.domain, Domain::Tech);
    assert!(outcome.retrieval.is_degraded());
}

#[tokio::test]
async fn unrecognized_route_is_terminal_but_traced() {
    let harness = Harness::new();
    harness.build_all().await;

    let result = harness.pipeline().handle("What is the meaning of life?").await;
    assert!(matches!(result, Err(AppError::Routing(_))));
    // Only the classifier was called
    assert_eq!(harness.client.call_count(), 1);

    let trace = harness.last_trace();
    assert!(matches!(trace.status, TraceStatus::Error { .. }));
    assert_eq!(trace.evaluation, EvaluationOutcome::Skipped);
}

#[tokio::test]
async fn fallback_policy_routes_to_default_domain() {
    let mut harness = Harness::new();
    harness.config.routing.on_failure = RoutingFailurePolicy::Default;
    harness.config.routing.default_domain = "finance".to_string();
    harness.build_all().await;

    let outcome = harness.pipeline().handle("What is the meaning of life?").await.unwrap();
    assert_eq!(outcome.route.domain, Domain::Finance);
    assert!(outcome.route.fallback);
    assert!(harness.last_trace().routing_fallback);
}

#[tokio::test]
async fn judge_failure_keeps_the_answer() {
    let harness = Harness::new();
    harness.build_all().await;
    let client = Arc::new(MockClient::new(|request: &LlmRequest| {
        if request.json_mode {
            Ok(LlmResponse::text("I'd give it a solid eight.", request.model.clone()))
        } else {
            scripted(request)
        }
    }));
    let clients = PipelineClients::shared(client, Arc::clone(&harness.embedder));
    let pipeline = Pipeline::new(&harness.config, clients, harness.sink.clone()).unwrap();

    let outcome = pipeline.handle("How do I reset my password?").await.unwrap();
    assert!(!outcome.response.answer.is_empty());
    assert!(matches!(outcome.evaluation, EvaluationOutcome::Failed { .. }));
    assert_eq!(outcome.evaluation.score(), None);
}

struct FailingSink;

#[async_trait::async_trait]
impl TraceSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn emit(&self, _trace: &Trace) -> AppResult<()> {
        Err(AppError::Trace("collector unreachable".to_string()))
    }
}

#[tokio::test]
async fn sink_failure_does_not_block_the_answer() {
    let harness = Harness::new();
    harness.build_all().await;
    let clients = PipelineClients::shared(harness.client.clone(), Arc::clone(&harness.embedder));
    let pipeline = Pipeline::new(&harness.config, clients, Arc::new(FailingSink)).unwrap();

    let outcome = pipeline.handle("How do I submit an expense report?").await.unwrap();
    assert_eq!(outcome.route.domain, Domain::Finance);
}

#[tokio::test]
async fn evaluator_thresholds_separate_grounded_from_irrelevant() {
    let judge = Arc::new(MockClient::new(|request: &LlmRequest| {
        let score = if request.prompt.contains("pizza") { 2 } else { 9 };
        Ok(LlmResponse::text(
            format!(r#"{{"score": {}, "reasoning": "graded"}}"#, score),
            request.model.clone(),
        ))
    }));
    let prompt = switchboard_prompt::load_prompt(Path::new("/nonexistent"), EVALUATOR_PROMPT).unwrap();
    let evaluator = Evaluator::new(judge, "judge", prompt, 300);

    let query = "How many sick days do I have per year?";
    let context = "Employees receive ten paid sick days per year.";

    let irrelevant = evaluator
        .score_with_context(query, "The cafeteria serves pizza on Fridays.", context)
        .await;
    let grounded = evaluator
        .score_with_context(query, "You have ten paid sick days per year.", context)
        .await;

    assert!(irrelevant.score().unwrap() < 6);
    assert!(grounded.score().unwrap() >= 8);
}

#[tokio::test]
async fn validation_run_is_reproducible() {
    let harness = Harness::new();
    harness.build_all().await;
    let pipeline = harness.pipeline();
    let cases = load_cases(&repo_root().join("tests").join("golden_data.json")).unwrap();
    assert_eq!(cases.len(), 45);

    let options = ValidationOptions {
        max_concurrency: 4,
        quality_sample: None,
    };
    let first = validate(&pipeline, &cases, &options).await;
    let second = validate(&pipeline, &cases, &options).await;

    assert_eq!(first.total, 45);
    assert_eq!(first.routing_accuracy, 100.0);
    assert!(first.mismatches.is_empty());
    assert_eq!(first.scored, 45);
    assert_eq!(first.mean_score, Some(9.0));
    assert!(first.passed());

    let key = |r: &switchboard_agents::validation::CaseResult| (r.id.clone(), r.observed, r.score());
    assert_eq!(
        first.results.iter().map(key).collect::<Vec<_>>(),
        second.results.iter().map(key).collect::<Vec<_>>()
    );
    assert_eq!(first.by_domain[&Domain::Tech].cases, 15);
    assert_eq!(harness.sink.len(), 90);
}

#[tokio::test]
async fn quality_sample_limits_evaluation() {
    let harness = Harness::new();
    harness.build_all().await;
    let pipeline = harness.pipeline();
    let cases = load_cases(&repo_root().join("tests").join("golden_data.json")).unwrap();

    let options = ValidationOptions {
        max_concurrency: 1,
        quality_sample: Some(10),
    };
    let report = validate(&pipeline, &cases[..20], &options).await;
    assert_eq!(report.total, 20);
    assert_eq!(report.scored, 10);
    assert_eq!(report.unscored, 0);
    assert!(report.results[10..]
        .iter()
        .all(|r| r.evaluation == EvaluationOutcome::Skipped));
}

#[tokio::test]
async fn rebuild_and_reload_serve_identical_results() {
    let harness = Harness::new();
    harness.build_all().await;
    let pipeline = harness.pipeline();

    let before = pipeline.handle("How do I install the VPN client?").await.unwrap();
    harness.build("Tech.md").await;
    pipeline.reload_indexes().unwrap();
    let after = pipeline.handle("How do I install the VPN client?").await.unwrap();

    let ids = |chunks: &[switchboard_knowledge::ScoredChunk]| {
        chunks.iter().map(|c| c.id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&before.response.chunks), ids(&after.response.chunks));
}
