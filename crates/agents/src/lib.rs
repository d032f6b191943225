//! Query routing, domain answering and answer scoring.
//!
//! A [`Pipeline`] routes each query to one [`Domain`] with the
//! [`Orchestrator`], answers it with that domain's [`DomainAgent`], scores the
//! answer with the [`Evaluator`] and hands a [`trace::Trace`] to the
//! configured sink.

pub mod agent;
pub mod cost;
pub mod domain;
pub mod evaluator;
pub mod indexes;
pub mod orchestrator;
pub mod pipeline;
pub mod trace;
pub mod validation;

pub use agent::{AgentAnswer, AgentSettings, DomainAgent, ResponseRecord};
pub use cost::CostEstimator;
pub use domain::Domain;
pub use evaluator::{EvaluationOutcome, EvaluationRecord, Evaluator};
pub use indexes::IndexCache;
pub use orchestrator::{Orchestrator, RouteDecision};
pub use pipeline::{Pipeline, PipelineClients, QueryOptions, QueryOutcome};
pub use trace::{RetrievalStatus, Trace, TraceSink};
pub use validation::{load_cases, validate, ValidationCase, ValidationOptions, ValidationReport};
