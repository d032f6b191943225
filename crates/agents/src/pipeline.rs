//! End-to-end query handling.
//!
//! route -> domain agent -> evaluator -> trace. Routing and generation
//! failures end the query with an error; evaluation and sink failures never
//! hide an answer.

use crate::agent::{AgentAnswer, DomainAgent, ResponseRecord};
use crate::cost::CostEstimator;
use crate::domain::Domain;
use crate::evaluator::{EvaluationOutcome, Evaluator};
use crate::indexes::IndexCache;
use crate::orchestrator::{Orchestrator, RouteDecision};
use crate::trace::{sink_from_config, CostEstimate, RetrievalStatus, TraceBuilder, TraceSink, TraceStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{AppConfig, AppError, AppResult};
use switchboard_knowledge::{provider_from_config, EmbeddingProvider};
use switchboard_llm::{client_from_config, LlmClient};
use tracing::Instrument;
use uuid::Uuid;

/// How one query was handled.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub trace_id: Uuid,
    pub route: RouteDecision,
    pub response: ResponseRecord,
    pub retrieval: RetrievalStatus,
    pub evaluation: EvaluationOutcome,
    pub latency_ms: u64,
    pub cost: CostEstimate,
}

/// Per-query options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Reference answer handed to the evaluator instead of retrieved context
    pub expected_answer: Option<String>,

    /// Skip the evaluator for this query
    pub skip_evaluation: bool,
}

pub struct Pipeline {
    orchestrator: Orchestrator,
    agents: HashMap<Domain, DomainAgent>,
    evaluator: Evaluator,
    indexes: Arc<IndexCache>,
    sink: Arc<dyn TraceSink>,
    costs: CostEstimator,
}

/// Model capabilities a pipeline is built from.
pub struct PipelineClients {
    pub generation: Arc<dyn LlmClient>,
    pub classifier: Arc<dyn LlmClient>,
    pub evaluator: Arc<dyn LlmClient>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl PipelineClients {
    /// One client serves classification, generation and scoring.
    pub fn shared(client: Arc<dyn LlmClient>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            generation: Arc::clone(&client),
            classifier: Arc::clone(&client),
            evaluator: client,
            embedder,
        }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self::shared(client_from_config(config)?, provider_from_config(config)?))
    }
}

impl Pipeline {
    pub fn new(
        config: &AppConfig,
        clients: PipelineClients,
        sink: Arc<dyn TraceSink>,
    ) -> AppResult<Self> {
        let indexes = Arc::new(IndexCache::new(config.vectors_dir()));

        let mut agents = HashMap::new();
        for domain in Domain::ALL {
            let agent = DomainAgent::from_config(
                config,
                domain,
                Arc::clone(&clients.generation),
                Arc::clone(&clients.embedder),
                Arc::clone(&indexes),
            )?;
            agents.insert(domain, agent);
        }

        Ok(Self {
            orchestrator: Orchestrator::from_config(config, clients.classifier)?,
            agents,
            evaluator: Evaluator::from_config(config, clients.evaluator)?,
            indexes,
            sink,
            costs: CostEstimator::from_config(config),
        })
    }

    /// Pipeline wired to the configured providers and trace sink.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Self::new(config, PipelineClients::from_config(config)?, sink_from_config(config)?)
    }

    pub fn indexes(&self) -> &IndexCache {
        &self.indexes
    }

    /// Pick up freshly published indexes on the next query.
    pub fn reload_indexes(&self) -> AppResult<()> {
        self.indexes.reload()
    }

    pub async fn handle(&self, query: &str) -> AppResult<QueryOutcome> {
        self.handle_with(query, QueryOptions::default()).await
    }

    pub async fn handle_with(&self, query: &str, options: QueryOptions) -> AppResult<QueryOutcome> {
        let mut trace = TraceBuilder::new(query);
        let span = tracing::info_span!("query", trace_id = %trace.id());

        async move {
            tracing::info!("Handling query");
            let result = self.run(query, &options, &mut trace).await;

            let status = match &result {
                Ok(_) => TraceStatus::Ok,
                Err(e) => TraceStatus::Error { message: e.to_string() },
            };
            let finished = trace.finalize(status, &self.costs);

            if let Err(e) = self.sink.emit(&finished).await {
                tracing::warn!("Trace sink '{}' failed: {}", self.sink.name(), e);
            }

            let (route, answer) = result?;
            Ok(QueryOutcome {
                trace_id: finished.id,
                route,
                response: answer.response,
                retrieval: answer.retrieval,
                evaluation: finished.evaluation,
                latency_ms: finished.latency_ms,
                cost: finished.cost,
            })
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        query: &str,
        options: &QueryOptions,
        trace: &mut TraceBuilder,
    ) -> AppResult<(RouteDecision, AgentAnswer)> {
        let route = self.orchestrator.route_traced(query, trace).await?;
        trace.set_route(route.domain, route.fallback);

        let agent = self.agents.get(&route.domain).ok_or_else(|| {
            AppError::Other(format!("No agent registered for {}", route.domain))
        })?;
        let answer = agent.answer_traced(query, trace).await?;
        trace.set_answer(answer.response.answer.clone());

        if !options.skip_evaluation {
            let context = options.expected_answer.as_deref().unwrap_or(&answer.context);
            let outcome = self
                .evaluator
                .score_traced(query, &answer.response.answer, context, trace)
                .await;
            trace.set_evaluation(outcome);
        }

        Ok((route, answer))
    }
}
