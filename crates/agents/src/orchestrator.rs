//! Query classification into exactly one domain.

use crate::domain::Domain;
use crate::trace::TraceBuilder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::config::RoutingFailurePolicy;
use switchboard_core::{AppConfig, AppError, AppResult};
use switchboard_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use switchboard_prompt::{build_prompt, load_prompt, PromptDefinition};

pub const ROUTE_PROMPT: &str = "orchestrator.route";

/// Where a query goes, and whether it got there by fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub domain: Domain,

    /// True when the failure policy picked the default domain
    pub fallback: bool,

    /// Why classification failed, for fallback decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Label the classifier produced, as returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,

    pub usage: LlmUsage,
}

pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
    on_failure: RoutingFailurePolicy,
    default_domain: Domain,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
            on_failure: RoutingFailurePolicy::Reject,
            default_domain: Domain::Hr,
        }
    }

    pub fn from_config(config: &AppConfig, client: Arc<dyn LlmClient>) -> AppResult<Self> {
        let prompt = load_prompt(&config.workspace, ROUTE_PROMPT)?;
        let default_domain = config.routing.default_domain.parse::<Domain>().map_err(|_| {
            AppError::Config(format!(
                "routing.defaultDomain '{}' is not a domain",
                config.routing.default_domain
            ))
        })?;

        Ok(Self::new(client, config.classifier_model(), prompt)
            .with_failure_policy(config.routing.on_failure, default_domain))
    }

    pub fn with_failure_policy(mut self, policy: RoutingFailurePolicy, default_domain: Domain) -> Self {
        self.on_failure = policy;
        self.default_domain = default_domain;
        self
    }

    pub async fn route(&self, query: &str) -> AppResult<RouteDecision> {
        let mut trace = TraceBuilder::new(query);
        self.route_traced(query, &mut trace).await
    }

    /// Classify `query` with one model call and record a `route` span.
    pub async fn route_traced(&self, query: &str, trace: &mut TraceBuilder) -> AppResult<RouteDecision> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query must not be empty".to_string()));
        }

        let span = trace.start_span("route", json!({ "query": query }));

        let built = build_prompt(
            &self.prompt,
            HashMap::from([("query".to_string(), query.to_string())]),
        )?;
        let mut request = LlmRequest::new(built.user, self.model.clone())
            .with_temperature(0.0)
            .with_required_tools(Domain::tools());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let (failure, usage, raw_label) = match self.client.complete(&request).await {
            Ok(response) => {
                let raw_label = raw_label(&response);
                match extract_domain(&response) {
                    Ok(domain) => {
                        tracing::info!("Routed query to {}", domain);
                        trace.end_span(
                            span,
                            json!({ "label": raw_label, "domain": domain, "fallback": false }),
                            Some(&response.model),
                            Some(response.usage),
                        );
                        return Ok(RouteDecision {
                            domain,
                            fallback: false,
                            reason: None,
                            raw_label: Some(raw_label),
                            usage: response.usage,
                        });
                    }
                    Err(reason) => (reason, Some(response.usage), Some(raw_label)),
                }
            }
            Err(e) => (format!("classifier call failed: {}", e), None, None),
        };

        match self.on_failure {
            RoutingFailurePolicy::Reject => {
                tracing::warn!("Routing failed: {}", failure);
                trace.fail_span(span, failure.clone(), Some(&self.model), usage);
                Err(AppError::Routing(failure))
            }
            RoutingFailurePolicy::Default => {
                tracing::warn!(
                    "Routing failed ({}), falling back to {}",
                    failure,
                    self.default_domain
                );
                trace.end_span(
                    span,
                    json!({
                        "label": raw_label,
                        "domain": self.default_domain,
                        "fallback": true,
                        "reason": failure,
                    }),
                    Some(&self.model),
                    usage,
                );
                Ok(RouteDecision {
                    domain: self.default_domain,
                    fallback: true,
                    reason: Some(failure),
                    raw_label,
                    usage: usage.unwrap_or_default(),
                })
            }
        }
    }
}

fn raw_label(response: &LlmResponse) -> String {
    match response.tool_calls.first() {
        Some(call) => call.name.clone(),
        None => response.content.trim().to_string(),
    }
}

/// First tool call name, or else the whole trimmed text, as a domain.
fn extract_domain(response: &LlmResponse) -> Result<Domain, String> {
    if let Some(call) = response.tool_calls.first() {
        return Domain::parse(&call.name)
            .ok_or_else(|| format!("unrecognized tool '{}'", call.name));
    }

    let text = response.content.trim();
    if text.is_empty() {
        return Err("classifier returned neither a tool call nor a label".to_string());
    }
    Domain::parse(text).ok_or_else(|| format!("unrecognized label '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_llm::MockClient;

    fn prompt() -> PromptDefinition {
        load_prompt(std::path::Path::new("/nonexistent"), ROUTE_PROMPT).unwrap()
    }

    fn orchestrator(client: MockClient) -> Orchestrator {
        Orchestrator::new(Arc::new(client), "router-model", prompt())
    }

    fn tool(name: &'static str) -> MockClient {
        MockClient::new(move |request| Ok(LlmResponse::tool_call(name, r#"{"query":"x"}"#, request.model.clone())))
    }

    #[tokio::test]
    async fn test_tool_call_routes() {
        let decision = orchestrator(tool("TechAgent")).route("My laptop won't turn on").await.unwrap();
        assert_eq!(decision.domain, Domain::Tech);
        assert!(!decision.fallback);
        assert_eq!(decision.raw_label.as_deref(), Some("TechAgent"));
    }

    #[tokio::test]
    async fn test_request_requires_one_of_three_tools() {
        let client = Arc::new(tool("HRAgent"));
        let orchestrator = Orchestrator::new(client.clone(), "router-model", prompt());
        orchestrator.route("How do I apply for parental leave?").await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].require_tool);
        assert_eq!(requests[0].tools.len(), 3);
        assert_eq!(requests[0].prompt, "How do I apply for parental leave?");
    }

    #[tokio::test]
    async fn test_text_label_routes() {
        let decision = orchestrator(MockClient::fixed(" Finance\n"))
            .route("How do I submit an expense report?")
            .await
            .unwrap();
        assert_eq!(decision.domain, Domain::Finance);
    }

    #[tokio::test]
    async fn test_unrecognized_label_is_rejected_by_default() {
        for client in [MockClient::fixed("Legal"), tool("LegalAgent"), MockClient::fixed("")] {
            let result = orchestrator(client).route("Can I sue my landlord?").await;
            assert!(matches!(result, Err(AppError::Routing(_))));
        }
    }

    #[tokio::test]
    async fn test_fallback_policy_applies_to_both_failure_kinds() {
        let failing = MockClient::new(|_| Err(AppError::Llm("connection refused".to_string())));
        for client in [MockClient::fixed("I think this is about law"), failing] {
            let decision = orchestrator(client)
                .with_failure_policy(RoutingFailurePolicy::Default, Domain::Tech)
                .route("anything")
                .await
                .unwrap();
            assert_eq!(decision.domain, Domain::Tech);
            assert!(decision.fallback);
            assert!(decision.reason.is_some());
        }
    }

    #[tokio::test]
    async fn test_empty_query_never_calls_model() {
        let client = Arc::new(tool("HRAgent"));
        let orchestrator = Orchestrator::new(client.clone(), "router-model", prompt());
        let result = orchestrator.route("   ").await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_route_span_recorded() {
        let mut trace = TraceBuilder::new("vpn");
        orchestrator(tool("TechAgent"))
            .route_traced("How do I set up VPN?", &mut trace)
            .await
            .unwrap();
        let span = &trace.spans()[0];
        assert_eq!(span.name, "route");
        assert_eq!(span.output["domain"], "tech");
    }

    #[test]
    fn test_route_outputs_are_closed() {
        let labels = ["hr", "HRAgent", "Tech", "finance", "Legal", "", "HR, Tech"];
        for label in labels {
            let response = LlmResponse::text(label, "m");
            match extract_domain(&response) {
                Ok(domain) => assert!(Domain::ALL.contains(&domain)),
                Err(reason) => assert!(!reason.is_empty()),
            }
        }
    }
}
