//! Prompt definitions compiled into the binary.
//!
//! A workspace file `.switchboard/prompts/<id>.yml` with the same id
//! replaces the built-in definition.

/// Classification prompt used by the orchestrator.
pub const ORCHESTRATOR_ROUTE: &str = "orchestrator.route";

/// Shared grounded answer prompt; `agent.answer.<domain>` overrides it per domain.
pub const AGENT_ANSWER: &str = "agent.answer";

/// Answer prompt used when retrieval is degraded.
pub const AGENT_ANSWER_UNGROUNDED: &str = "agent.answer.ungrounded";

/// Evaluator scoring prompt.
pub const EVALUATOR_SCORE: &str = "evaluator.score";

const BUILTINS: [(&str, &str); 4] = [
    (
        ORCHESTRATOR_ROUTE,
        include_str!("../prompts/orchestrator.route.yml"),
    ),
    (AGENT_ANSWER, include_str!("../prompts/agent.answer.yml")),
    (
        AGENT_ANSWER_UNGROUNDED,
        include_str!("../prompts/agent.answer.ungrounded.yml"),
    ),
    (EVALUATOR_SCORE, include_str!("../prompts/evaluator.score.yml")),
];

/// Raw YAML of a built-in prompt.
pub fn builtin_yaml(prompt_id: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(id, _)| *id == prompt_id)
        .map(|(_, yaml)| *yaml)
}

/// Ids of every built-in prompt.
pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(id, _)| *id)
}
