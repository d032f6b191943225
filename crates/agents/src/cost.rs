//! Token cost estimation from the configured pricing table.

use crate::trace::{CostEstimate, Span};
use std::collections::HashMap;
use switchboard_core::config::ModelPricing;
use switchboard_core::AppConfig;
use switchboard_llm::LlmUsage;

#[derive(Debug, Clone, Default)]
pub struct CostEstimator {
    pricing: HashMap<String, ModelPricing>,
}

impl CostEstimator {
    pub fn new(pricing: HashMap<String, ModelPricing>) -> Self {
        Self { pricing }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.pricing.clone())
    }

    /// Pricing for `model`, matching dated snapshots by the longest known
    /// prefix (`gpt-4o-2024-08-06` uses `gpt-4o`).
    pub fn pricing_for(&self, model: &str) -> Option<ModelPricing> {
        if let Some(price) = self.pricing.get(model) {
            return Some(*price);
        }
        self.pricing
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, price)| *price)
    }

    /// Cost of a single call, or `None` for an unpriced model.
    pub fn call_cost(&self, model: &str, usage: &LlmUsage) -> Option<f64> {
        self.pricing_for(model).map(|price| {
            usage.prompt_tokens as f64 / 1000.0 * price.prompt_per_1k
                + usage.completion_tokens as f64 / 1000.0 * price.completion_per_1k
        })
    }

    /// Sum over every span that called a model.
    pub fn estimate(&self, spans: &[Span]) -> CostEstimate {
        let mut estimate = CostEstimate {
            usd: 0.0,
            known: true,
        };

        for span in spans {
            let (Some(model), Some(usage)) = (&span.model, &span.usage) else {
                continue;
            };
            match self.call_cost(model, usage) {
                Some(cost) => estimate.usd += cost,
                None => {
                    tracing::debug!("No pricing for model '{}'", model);
                    estimate.known = false;
                }
            }
        }

        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::SpanStatus;
    use chrono::Utc;

    fn span(model: &str, prompt: u32, completion: u32) -> Span {
        Span {
            name: "generation".to_string(),
            started_at: Utc::now(),
            latency_ms: 5,
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            model: Some(model.to_string()),
            usage: Some(LlmUsage::new(prompt, completion)),
            status: SpanStatus::Ok,
        }
    }

    fn estimator() -> CostEstimator {
        CostEstimator::new(HashMap::from([
            ("gpt-4".to_string(), ModelPricing::new(0.03, 0.06)),
            ("gpt-4o".to_string(), ModelPricing::new(0.0025, 0.01)),
        ]))
    }

    #[test]
    fn test_prefix_match_prefers_longest() {
        let price = estimator().pricing_for("gpt-4o-2024-08-06").unwrap();
        assert_eq!(price.prompt_per_1k, 0.0025);
        assert!(estimator().pricing_for("llama3").is_none());
    }

    #[test]
    fn test_estimate_sums_priced_spans() {
        let cost = estimator().estimate(&[span("gpt-4", 1000, 500), span("gpt-4", 1000, 0)]);
        assert!((cost.usd - 0.09).abs() < 1e-9);
        assert!(cost.known);
    }

    #[test]
    fn test_unknown_model_marks_estimate() {
        let cost = estimator().estimate(&[span("gpt-4", 1000, 0), span("llama3", 1000, 1000)]);
        assert!((cost.usd - 0.03).abs() < 1e-9);
        assert!(!cost.known);
    }
}
