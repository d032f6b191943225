//! Replay labeled cases through the pipeline and grade the run.

use crate::domain::Domain;
use crate::evaluator::EvaluationOutcome;
use crate::pipeline::{Pipeline, QueryOptions};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use switchboard_core::{AppError, AppResult};

pub const ROUTING_ACCURACY_THRESHOLD: f64 = 85.0;
pub const MEAN_SCORE_THRESHOLD: f64 = 7.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCase {
    #[serde(default)]
    pub id: Option<String>,
    pub query: String,
    #[serde(alias = "expected_agent")]
    pub expected_domain: Domain,
    #[serde(default)]
    pub expected_answer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Read a JSON array of cases.
pub fn load_cases(path: &Path) -> AppResult<Vec<ValidationCase>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read validation cases {:?}: {}", path, e))
    })?;
    let cases: Vec<ValidationCase> = serde_json::from_str(&contents).map_err(|e| {
        AppError::Serialization(format!("Invalid validation cases {:?}: {}", path, e))
    })?;
    tracing::info!("Loaded {} validation cases from {:?}", cases.len(), path);
    Ok(cases)
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Cases in flight at once; results keep input order
    pub max_concurrency: usize,

    /// Evaluate only the first N cases
    pub quality_sample: Option<usize>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 1,
            quality_sample: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub id: String,
    pub query: String,
    pub expected: Domain,
    pub observed: Option<Domain>,
    pub correct: bool,
    pub fallback: bool,
    pub evaluation: EvaluationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl CaseResult {
    pub fn score(&self) -> Option<u8> {
        self.evaluation.score()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainBreakdown {
    pub cases: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_score: Option<f64>,
    pub difficulty: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total: usize,
    pub correct: usize,

    /// Percentage, 0-100
    pub routing_accuracy: f64,

    pub mean_score: Option<f64>,
    pub min_score: Option<u8>,
    pub max_score: Option<u8>,
    pub scored: usize,

    /// Evaluated cases that produced no score
    pub unscored: usize,

    pub by_domain: BTreeMap<Domain, DomainBreakdown>,

    /// Misrouted or failed cases
    pub mismatches: Vec<CaseResult>,

    pub results: Vec<CaseResult>,
    pub routing_pass: bool,
    pub quality_pass: bool,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.routing_pass && self.quality_pass
    }

    pub fn from_results(results: Vec<CaseResult>, evaluated: usize) -> Self {
        let total = results.len();
        let correct = results.iter().filter(|r| r.correct).count();
        let scores: Vec<u8> = results.iter().filter_map(CaseResult::score).collect();

        let mut by_domain: BTreeMap<Domain, (DomainBreakdown, Vec<u8>)> = BTreeMap::new();
        for result in &results {
            let (entry, domain_scores) = by_domain.entry(result.expected).or_default();
            entry.cases += 1;
            if result.correct {
                entry.correct += 1;
            }
            let difficulty = result.difficulty.clone().unwrap_or_else(|| "unknown".to_string());
            *entry.difficulty.entry(difficulty).or_default() += 1;
            domain_scores.extend(result.score());
        }

        let by_domain = by_domain
            .into_iter()
            .map(|(domain, (mut breakdown, domain_scores))| {
                breakdown.accuracy = percentage(breakdown.correct, breakdown.cases);
                breakdown.mean_score = mean(&domain_scores);
                (domain, breakdown)
            })
            .collect();

        let routing_accuracy = percentage(correct, total);
        let mean_score = mean(&scores);

        Self {
            total,
            correct,
            routing_accuracy,
            mean_score,
            min_score: scores.iter().min().copied(),
            max_score: scores.iter().max().copied(),
            scored: scores.len(),
            unscored: evaluated.saturating_sub(scores.len()),
            by_domain,
            mismatches: results.iter().filter(|r| !r.correct).cloned().collect(),
            results,
            routing_pass: total > 0 && routing_accuracy >= ROUTING_ACCURACY_THRESHOLD,
            quality_pass: mean_score.is_some_and(|m| m >= MEAN_SCORE_THRESHOLD),
        }
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn mean(scores: &[u8]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64)
    }
}

/// Run every case through `pipeline`. Never fails; pipeline errors are
/// recorded per case and count as misses.
pub async fn validate(
    pipeline: &Pipeline,
    cases: &[ValidationCase],
    options: &ValidationOptions,
) -> ValidationReport {
    let sample = options.quality_sample.unwrap_or(cases.len()).min(cases.len());
    tracing::info!(
        "Validating {} cases ({} evaluated, concurrency {})",
        cases.len(),
        sample,
        options.max_concurrency.max(1)
    );

    let results: Vec<CaseResult> = stream::iter(cases.iter().enumerate())
        .map(|(position, case)| run_case(pipeline, position, case, position < sample))
        .buffered(options.max_concurrency.max(1))
        .collect()
        .await;

    let report = ValidationReport::from_results(results, sample);
    tracing::info!(
        "Validation finished: accuracy {:.1}%, mean score {:?}",
        report.routing_accuracy,
        report.mean_score
    );
    report
}

async fn run_case(
    pipeline: &Pipeline,
    position: usize,
    case: &ValidationCase,
    evaluate: bool,
) -> CaseResult {
    let id = case
        .id
        .clone()
        .unwrap_or_else(|| format!("case-{}", position + 1));
    let options = QueryOptions {
        expected_answer: case.expected_answer.clone(),
        skip_evaluation: !evaluate,
    };

    match pipeline.handle_with(&case.query, options).await {
        Ok(outcome) => {
            let correct = outcome.route.domain == case.expected_domain;
            if !correct {
                tracing::debug!(
                    "{}: expected {}, routed to {}",
                    id,
                    case.expected_domain,
                    outcome.route.domain
                );
            }
            CaseResult {
                id,
                query: case.query.clone(),
                expected: case.expected_domain,
                observed: Some(outcome.route.domain),
                correct,
                fallback: outcome.route.fallback,
                evaluation: outcome.evaluation,
                error: None,
                difficulty: case.difficulty.clone(),
            }
        }
        Err(e) => {
            tracing::warn!("{}: pipeline error: {}", id, e);
            CaseResult {
                id,
                query: case.query.clone(),
                expected: case.expected_domain,
                observed: None,
                correct: false,
                fallback: false,
                evaluation: if evaluate {
                    EvaluationOutcome::Failed {
                        reason: e.to_string(),
                    }
                } else {
                    EvaluationOutcome::Skipped
                },
                error: Some(e.to_string()),
                difficulty: case.difficulty.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationRecord;
    use tempfile::TempDir;

    fn result(expected: Domain, observed: Domain, score: Option<u8>) -> CaseResult {
        CaseResult {
            id: "x".to_string(),
            query: "q".to_string(),
            expected,
            observed: Some(observed),
            correct: expected == observed,
            fallback: false,
            evaluation: match score {
                Some(score) => EvaluationOutcome::Scored(EvaluationRecord {
                    score,
                    raw_score: score as f64,
                    reasoning: String::new(),
                }),
                None => EvaluationOutcome::Failed {
                    reason: "bad json".to_string(),
                },
            },
            error: None,
            difficulty: Some("easy".to_string()),
        }
    }

    #[test]
    fn test_load_cases_accepts_expected_agent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("golden_data.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "hr_001", "query": "How do I apply for parental leave?", "expected_agent": "HRAgent",
                 "category": "leave_policy", "difficulty": "easy", "expected_answer": "Use the HR portal."},
                {"query": "VPN is down", "expected_domain": "tech"}
            ]"#,
        )
        .unwrap();

        let cases = load_cases(&path).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].expected_domain, Domain::Hr);
        assert_eq!(cases[1].expected_domain, Domain::Tech);
        assert!(cases[1].id.is_none());
    }

    #[test]
    fn test_load_cases_rejects_unknown_domain() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cases.json");
        std::fs::write(&path, r#"[{"query": "q", "expected_agent": "LegalAgent"}]"#).unwrap();
        assert!(load_cases(&path).is_err());
    }

    #[test]
    fn test_thresholds() {
        let mut results: Vec<CaseResult> = (0..17).map(|_| result(Domain::Hr, Domain::Hr, Some(7))).collect();
        results.extend((0..3).map(|_| result(Domain::Tech, Domain::Finance, Some(7))));

        let report = ValidationReport::from_results(results, 20);
        assert_eq!(report.routing_accuracy, 85.0);
        assert!(report.routing_pass);
        assert_eq!(report.mean_score, Some(7.0));
        assert!(report.passed());
        assert_eq!(report.mismatches.len(), 3);
        assert_eq!(report.by_domain[&Domain::Tech].accuracy, 0.0);
        assert_eq!(report.by_domain[&Domain::Hr].difficulty["easy"], 17);
    }

    #[test]
    fn test_quality_gate_needs_a_score() {
        let results = vec![result(Domain::Hr, Domain::Hr, None), result(Domain::Hr, Domain::Hr, None)];
        let report = ValidationReport::from_results(results, 2);
        assert!(report.routing_pass);
        assert!(!report.quality_pass);
        assert_eq!(report.mean_score, None);
        assert_eq!(report.unscored, 2);
    }

    #[test]
    fn test_low_mean_fails() {
        let results = vec![
            result(Domain::Finance, Domain::Finance, Some(9)),
            result(Domain::Finance, Domain::Finance, Some(4)),
        ];
        let report = ValidationReport::from_results(results, 2);
        assert_eq!(report.mean_score, Some(6.5));
        assert_eq!(report.min_score, Some(4));
        assert_eq!(report.max_score, Some(9));
        assert!(!report.passed());
    }
}
