//! LLM client abstraction and request/response types.
//!
//! Every external model capability used by Switchboard (classification,
//! answer generation, scoring) goes through the single-method [`LlmClient`]
//! trait, so a concrete provider can be swapped or mocked without touching
//! calling code.

use serde::{Deserialize, Serialize};
use switchboard_core::AppResult;

/// A function the model may call instead of answering in text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Function name presented to the model
    pub name: String,

    /// What the function is for; the model chooses based on this
    pub description: String,

    /// JSON schema of the function arguments
    pub parameters: serde_json::Value,
}

impl ToolSpec {
    /// Create a tool taking a single free-text `query` argument.
    pub fn with_query_argument(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user query to forward"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}

/// A function call emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Name of the called function
    pub name: String,

    /// Raw JSON arguments as produced by the model
    #[serde(default)]
    pub arguments: String,
}

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The prompt text to send to the LLM
    pub prompt: String,

    /// Model identifier (e.g., "gpt-4", "llama3.2")
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// System prompt (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Functions offered to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Force the model to call one of `tools`
    #[serde(default)]
    pub require_tool: bool,

    /// Ask the provider to constrain output to a JSON object
    #[serde(default)]
    pub json_mode: bool,
}

impl LlmRequest {
    /// Create a new LLM request with required fields.
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            max_tokens: None,
            temperature: None,
            system: None,
            tools: Vec::new(),
            require_tool: false,
            json_mode: false,
        }
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Offer a closed set of functions and require the model to call one.
    pub fn with_required_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self.require_tool = true;
        self
    }

    /// Request JSON object output.
    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// LLM completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text (empty when the model only called a tool)
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,

    /// Function calls, in the order the model emitted them
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// A plain text response.
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: LlmUsage::default(),
            tool_calls: Vec::new(),
        }
    }

    /// A response consisting of a single function call.
    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            model: model.into(),
            usage: LlmUsage::default(),
            tool_calls: vec![ToolCall {
                name: name.into(),
                arguments: arguments.into(),
            }],
        }
    }

    /// Attach usage statistics.
    pub fn with_usage(mut self, usage: LlmUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LlmUsage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    /// Create usage stats from prompt and completion token counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::Add for LlmUsage {
    type Output = LlmUsage;

    fn add(self, other: LlmUsage) -> LlmUsage {
        LlmUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

impl std::ops::AddAssign for LlmUsage {
    fn add_assign(&mut self, other: LlmUsage) {
        *self = *self + other;
    }
}

/// Trait for LLM providers.
///
/// One request in, one structured response out. Implementations fail with
/// `AppError::Llm` so callers can tell provider failures apart from their own.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Get the provider name (e.g., "ollama", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse>;
}
