//! Retrieval-augmented answering for one domain.

use crate::domain::Domain;
use crate::indexes::IndexCache;
use crate::trace::{RetrievalStatus, TraceBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{AppConfig, AppError, AppResult};
use switchboard_knowledge::{EmbeddingProvider, ScoredChunk};
use switchboard_llm::{LlmClient, LlmRequest, LlmUsage};
use switchboard_prompt::{build_prompt, load_prompt, load_prompt_or, PromptDefinition};

pub const ANSWER_PROMPT: &str = "agent.answer";
pub const UNGROUNDED_PROMPT: &str = "agent.answer.ungrounded";

/// An answer produced by a domain agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub answer: String,
    pub domain: Domain,

    /// Chunks the answer was grounded on, highest similarity first
    pub chunks: Vec<ScoredChunk>,

    pub grounded: bool,
    pub model: String,
    pub usage: LlmUsage,
}

#[derive(Debug, Clone)]
pub struct AgentAnswer {
    pub response: ResponseRecord,
    pub retrieval: RetrievalStatus,

    /// Context passed to the model (empty when degraded)
    pub context: String,
}

/// Settings shared by every domain agent.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            top_k: config.retrieval.top_k,
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
        }
    }
}

pub struct DomainAgent {
    domain: Domain,
    client: Arc<dyn LlmClient>,
    embedder: Arc<dyn EmbeddingProvider>,
    indexes: Arc<IndexCache>,
    prompt: PromptDefinition,
    ungrounded_prompt: PromptDefinition,
    settings: AgentSettings,
}

impl DomainAgent {
    pub fn new(
        domain: Domain,
        client: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexes: Arc<IndexCache>,
        prompts: (PromptDefinition, PromptDefinition),
        settings: AgentSettings,
    ) -> Self {
        let (prompt, ungrounded_prompt) = prompts;
        Self {
            domain,
            client,
            embedder,
            indexes,
            prompt,
            ungrounded_prompt,
            settings,
        }
    }

    /// Agent using `agent.answer.<domain>` when the workspace defines one.
    pub fn from_config(
        config: &AppConfig,
        domain: Domain,
        client: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexes: Arc<IndexCache>,
    ) -> AppResult<Self> {
        let preferred = format!("{}.{}", ANSWER_PROMPT, domain.as_str());
        let prompt = load_prompt_or(&config.workspace, &preferred, ANSWER_PROMPT)?;
        let ungrounded = load_prompt(&config.workspace, UNGROUNDED_PROMPT)?;

        Ok(Self::new(
            domain,
            client,
            embedder,
            indexes,
            (prompt, ungrounded),
            AgentSettings::from_config(config),
        ))
    }

    pub async fn answer(&self, query: &str) -> AppResult<AgentAnswer> {
        let mut trace = TraceBuilder::new(query);
        self.answer_traced(query, &mut trace).await
    }

    /// Retrieve, then generate. Retrieval problems degrade to an
    /// ungrounded answer; generation problems are errors.
    pub async fn answer_traced(&self, query: &str, trace: &mut TraceBuilder) -> AppResult<AgentAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let span = trace.start_span(
            "retrieval",
            json!({ "domain": self.domain, "top_k": self.settings.top_k }),
        );
        let (chunks, retrieval) = match self.retrieve(query).await {
            Ok(chunks) if !chunks.is_empty() => (chunks, RetrievalStatus::Grounded),
            Ok(_) => (
                Vec::new(),
                RetrievalStatus::Degraded {
                    reason: format!("index '{}' is empty", self.domain.index_name()),
                },
            ),
            Err(e) => (Vec::new(), RetrievalStatus::Degraded { reason: e.to_string() }),
        };

        if let RetrievalStatus::Degraded { reason } = &retrieval {
            tracing::warn!("{} retrieval degraded: {}", self.domain, reason);
        } else {
            tracing::info!("{} retrieved {} chunks", self.domain, chunks.len());
        }
        trace.end_span(
            span,
            json!({
                "chunk_ids": chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
                "scores": chunks.iter().map(|c| c.score).collect::<Vec<_>>(),
                "degraded": retrieval.is_degraded(),
            }),
            None,
            None,
        );
        trace.set_retrieval(retrieval.clone());

        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut variables = HashMap::from([
            ("question".to_string(), query.to_string()),
            ("agent_type".to_string(), self.domain.label().to_string()),
        ]);
        let definition = if retrieval.is_degraded() {
            &self.ungrounded_prompt
        } else {
            variables.insert("context".to_string(), context.clone());
            &self.prompt
        };
        let built = build_prompt(definition, variables)?;

        let span = trace.start_span(
            "generation",
            json!({ "prompt_id": definition.id, "prompt": built.full_text() }),
        );

        let mut request = LlmRequest::new(built.user, self.settings.model.clone())
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let completion = match self.client.complete(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                let message = format!("{} agent generation failed: {}", self.domain, e);
                trace.fail_span(span, message.clone(), Some(&self.settings.model), None);
                return Err(AppError::Llm(message));
            }
        };

        tracing::debug!("{} completion: {}", self.domain, completion.content);
        let answer = completion.content.trim().to_string();
        if answer.is_empty() {
            let message = format!("{} agent model returned an empty completion", self.domain);
            trace.fail_span(
                span,
                message.clone(),
                Some(&completion.model),
                Some(completion.usage),
            );
            return Err(AppError::Llm(message));
        }

        trace.end_span(
            span,
            json!(completion.content),
            Some(&completion.model),
            Some(completion.usage),
        );

        let grounded = !retrieval.is_degraded();
        Ok(AgentAnswer {
            response: ResponseRecord {
                answer,
                domain: self.domain,
                chunks,
                grounded,
                model: completion.model,
                usage: completion.usage,
            },
            retrieval,
            context,
        })
    }

    async fn retrieve(&self, query: &str) -> AppResult<Vec<ScoredChunk>> {
        let index = self.indexes.get(self.domain)?;
        let manifest = index.manifest();
        if manifest.embedding_provider != self.embedder.provider_name()
            || manifest.embedding_model != self.embedder.model_name()
        {
            return Err(AppError::Knowledge(format!(
                "index '{}' was built with {}/{}, configured embedder is {}/{}",
                manifest.index_name,
                manifest.embedding_provider,
                manifest.embedding_model,
                self.embedder.provider_name(),
                self.embedder.model_name()
            )));
        }
        if index.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        index.search(&embedding, self.settings.top_k)
    }
}
