//! Configuration management for Switchboard.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.switchboard/config.yaml` or an explicit path)
//! - Environment variables
//! - Command-line flags
//!
//! Configuration is read once at process start and passed explicitly to every
//! component; there is no global state and no hot reload.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".switchboard";

/// Providers accepted for classification, generation and scoring.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "ollama"];

/// Providers accepted for embeddings.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "hashed"];

/// Trace sinks accepted in `trace.sink`.
pub const KNOWN_TRACE_SINKS: [&str; 5] = ["jsonl", "langfuse", "log", "memory", "none"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .switchboard/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Model provider for classification, generation and scoring
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the model provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Custom provider endpoint (OpenAI-compatible base URL or Ollama URL)
    pub endpoint: Option<String>,

    /// HTTP timeout applied to every external call
    pub request_timeout_secs: u64,

    /// Allow local providers to offload to the GPU
    pub use_gpu: bool,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub routing: RoutingSettings,
    pub evaluation: EvaluationSettings,
    pub trace: TraceSettings,

    /// USD prices per 1K tokens, keyed by model identifier
    pub pricing: HashMap<String, ModelPricing>,

    /// Where `endpoint` and `embedding.endpoint` may come from; resolved
    /// again whenever the provider changes
    #[serde(skip)]
    endpoint_sources: EndpointSources,
}

/// Endpoint candidates from the config file and provider-specific env vars.
#[derive(Debug, Clone, Default, PartialEq)]
struct EndpointSources {
    llm: Option<String>,
    embedding: Option<String>,
    openai_base_url: Option<String>,
    ollama_url: Option<String>,
}

impl EndpointSources {
    fn for_provider(&self, provider: &str) -> Option<String> {
        match provider {
            "openai" => self.openai_base_url.clone(),
            "ollama" => self.ollama_url.clone(),
            _ => None,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "openai", "ollama" or "hashed"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Expected vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    pub batch_size: usize,

    /// Endpoint override (falls back to the provider default)
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 32,
            endpoint: None,
        }
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Number of chunks retrieved per query
    pub top_k: usize,

    /// Window size in characters
    pub chunk_size: usize,

    /// Overlap with the previous window in characters
    pub chunk_overlap: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 130,
        }
    }
}

/// What the orchestrator does when classification fails.
///
/// The same policy applies to call errors and to unrecognized labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingFailurePolicy {
    /// Report a routing error to the caller
    #[default]
    Reject,
    /// Route to `routing.defaultDomain` and flag the decision as a fallback
    Default,
}

impl RoutingFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" | "error" => Some(Self::Reject),
            "default" | "fallback" => Some(Self::Default),
            _ => None,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingSettings {
    pub on_failure: RoutingFailurePolicy,

    /// Domain label used when `on_failure` is `default`
    pub default_domain: String,

    /// Classifier model (defaults to the main model)
    pub model: Option<String>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            on_failure: RoutingFailurePolicy::Reject,
            default_domain: "hr".to_string(),
            model: None,
        }
    }
}

/// Evaluator (LLM-as-judge) settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EvaluationSettings {
    pub enabled: bool,

    /// Judge model (defaults to the main model)
    pub model: Option<String>,

    pub max_tokens: u32,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            max_tokens: 300,
        }
    }
}

/// Trace sink settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TraceSettings {
    /// Sink name: "jsonl", "langfuse", "log", "memory" or "none"
    pub sink: String,

    pub langfuse_host: String,

    #[serde(skip_serializing)]
    pub langfuse_public_key: Option<String>,

    #[serde(skip_serializing)]
    pub langfuse_secret_key: Option<String>,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            sink: "jsonl".to_string(),
            langfuse_host: "https://cloud.langfuse.com".to_string(),
            langfuse_public_key: None,
            langfuse_secret_key: None,
        }
    }
}

/// Token prices for one model, in USD per 1K tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelPricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl ModelPricing {
    pub const fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            prompt_per_1k,
            completion_per_1k,
        }
    }
}

fn default_pricing() -> HashMap<String, ModelPricing> {
    [
        ("gpt-4", ModelPricing::new(0.03, 0.06)),
        ("gpt-4-turbo", ModelPricing::new(0.01, 0.03)),
        ("gpt-4o", ModelPricing::new(0.0025, 0.01)),
        ("gpt-4o-mini", ModelPricing::new(0.00015, 0.0006)),
        ("gpt-3.5-turbo", ModelPricing::new(0.0005, 0.0015)),
    ]
    .into_iter()
    .map(|(model, price)| (model.to_string(), price))
    .collect()
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    generation: Option<GenerationSettings>,
    routing: Option<RoutingSettings>,
    evaluation: Option<EvaluationSettings>,
    trace: Option<TraceSettings>,
    pricing: Option<HashMap<String, ModelPricing>>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    /// Environment variable holding the API key
    api_key_env: Option<String>,
    request_timeout_secs: Option<u64>,
    use_gpu: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            endpoint: None,
            request_timeout_secs: 60,
            use_gpu: true,
            log_level: None,
            verbose: false,
            no_color: false,
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            routing: RoutingSettings::default(),
            evaluation: EvaluationSettings::default(),
            trace: TraceSettings::default(),
            pricing: default_pricing(),
            endpoint_sources: EndpointSources::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// Environment variables:
    /// - `SWITCHBOARD_WORKSPACE`, `SWITCHBOARD_CONFIG`, `SWITCHBOARD_PROVIDER`
    /// - `LLM_MODEL`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OLLAMA_URL`
    /// - `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`, `USE_GPU`
    /// - `EVALUATOR_MODEL`, `TRACE_SINK`
    /// - `LANGFUSE_PUBLIC_KEY`, `LANGFUSE_SECRET_KEY`, `LANGFUSE_HOST`
    /// - `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use switchboard_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration with an explicit workspace and/or config file.
    ///
    /// Explicit arguments take precedence over `SWITCHBOARD_WORKSPACE` and
    /// `SWITCHBOARD_CONFIG`.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("SWITCHBOARD_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("SWITCHBOARD_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        let mut api_key_env = "OPENAI_API_KEY".to_string();
        if config_path.exists() {
            let (merged, key_env) = config.merge_yaml(&config_path)?;
            config = merged;
            if let Some(key_env) = key_env {
                api_key_env = key_env;
            }
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        config.endpoint_sources.llm = config.endpoint.clone();
        config.endpoint_sources.embedding = config.embedding.endpoint.clone();

        // Environment variables override YAML config
        config.apply_env(&api_key_env, |key| std::env::var(key).ok())?;
        config.resolve_endpoints();

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    ///
    /// Returns the merged config and the API key variable named by the file, if any.
    fn merge_yaml(&self, path: &Path) -> AppResult<(Self, Option<String>)> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);
        Ok(self.clone().merge_file(file))
    }

    fn merge_file(mut self, file: ConfigFile) -> (Self, Option<String>) {
        let mut api_key_env = None;

        if let Some(ws) = file.workspace {
            if let Some(path) = ws.path {
                self.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.endpoint = llm.endpoint;
            }
            if let Some(timeout) = llm.request_timeout_secs {
                self.request_timeout_secs = timeout;
            }
            if let Some(use_gpu) = llm.use_gpu {
                self.use_gpu = use_gpu;
            }
            api_key_env = llm.api_key_env;
        }

        if let Some(embedding) = file.embedding {
            self.embedding = embedding;
        }
        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }
        if let Some(generation) = file.generation {
            self.generation = generation;
        }
        if let Some(routing) = file.routing {
            self.routing = routing;
        }
        if let Some(evaluation) = file.evaluation {
            self.evaluation = evaluation;
        }
        if let Some(trace) = file.trace {
            self.trace = trace;
        }
        if let Some(pricing) = file.pricing {
            self.pricing.extend(pricing);
        }

        (self, api_key_env)
    }

    fn apply_env<F>(&mut self, api_key_env: &str, var: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = var("SWITCHBOARD_PROVIDER") {
            self.provider = provider;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.model = model;
        }
        if let Some(key) = var(api_key_env) {
            self.api_key = Some(key);
        }
        // Matched against the provider later, once CLI overrides are in
        if let Some(url) = var("OPENAI_BASE_URL") {
            self.endpoint_sources.openai_base_url = Some(url);
        }
        if let Some(url) = var("OLLAMA_URL") {
            self.endpoint_sources.ollama_url = Some(url);
        }
        if let Some(provider) = var("EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(flag) = var("USE_GPU") {
            self.use_gpu = parse_bool(&flag).ok_or_else(|| {
                AppError::Config(format!("USE_GPU must be a boolean, got '{}'", flag))
            })?;
        }
        if let Some(policy) = var("ROUTING_ON_FAILURE") {
            self.routing.on_failure = RoutingFailurePolicy::parse(&policy).ok_or_else(|| {
                AppError::Config(format!(
                    "ROUTING_ON_FAILURE must be 'reject' or 'default', got '{}'",
                    policy
                ))
            })?;
        }
        if let Some(model) = var("EVALUATOR_MODEL") {
            self.evaluation.model = Some(model);
        }
        if let Some(sink) = var("TRACE_SINK") {
            self.trace.sink = sink;
        }
        if let Some(key) = var("LANGFUSE_PUBLIC_KEY") {
            self.trace.langfuse_public_key = Some(key);
        }
        if let Some(key) = var("LANGFUSE_SECRET_KEY") {
            self.trace.langfuse_secret_key = Some(key);
        }
        if let Some(host) = var("LANGFUSE_HOST") {
            self.trace.langfuse_host = host;
        }
        if self.log_level.is_none() {
            self.log_level = var("RUST_LOG");
        }
        if var("NO_COLOR").is_some() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
            self.resolve_endpoints();
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Pick the endpoints for the active providers: the matching env URL
    /// (`OPENAI_BASE_URL` / `OLLAMA_URL`) wins over the config file.
    fn resolve_endpoints(&mut self) {
        let sources = &self.endpoint_sources;
        self.endpoint = sources
            .for_provider(&self.provider)
            .or_else(|| sources.llm.clone());
        let embedding_env = if self.embedding.provider == "ollama" {
            sources.ollama_url.clone()
        } else {
            None
        };
        self.embedding.endpoint = embedding_env.or_else(|| sources.embedding.clone());
    }

    /// Get the path to the .switchboard directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .switchboard directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Directory holding one similarity index per domain.
    pub fn vectors_dir(&self) -> PathBuf {
        self.state_dir().join("vectors")
    }

    /// Directory holding the JSONL trace log.
    pub fn traces_dir(&self) -> PathBuf {
        self.state_dir().join("traces")
    }

    /// Model used by the orchestrator's classifier.
    pub fn classifier_model(&self) -> &str {
        self.routing.model.as_deref().unwrap_or(&self.model)
    }

    /// Model used by the evaluator.
    pub fn evaluator_model(&self) -> &str {
        self.evaluation.model.as_deref().unwrap_or(&self.model)
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let needs_openai_key = self.provider == "openai" || self.embedding.provider == "openai";
        if needs_openai_key && self.api_key.is_none() {
            return Err(AppError::Config(
                "OpenAI provider requires an API key (set OPENAI_API_KEY)".to_string(),
            ));
        }

        if !KNOWN_TRACE_SINKS.contains(&self.trace.sink.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown trace sink: {}. Supported: {}",
                self.trace.sink,
                KNOWN_TRACE_SINKS.join(", ")
            )));
        }

        if self.trace.sink == "langfuse"
            && (self.trace.langfuse_public_key.is_none()
                || self.trace.langfuse_secret_key.is_none())
        {
            return Err(AppError::Config(
                "Langfuse sink requires LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY".to_string(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("retrieval.topK must be at least 1".to_string()));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "retrieval.chunkOverlap ({}) must be smaller than retrieval.chunkSize ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.dimensions and embedding.batchSize must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
