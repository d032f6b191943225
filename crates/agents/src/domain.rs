//! The closed set of domains a query can be routed to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use switchboard_core::AppError;
use switchboard_llm::ToolSpec;

/// Department that owns a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Domain {
    Hr,
    Tech,
    Finance,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Hr, Domain::Tech, Domain::Finance];

    /// Parse a canonical name (`hr`), display label (`HR`) or tool name
    /// (`HRAgent`), case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|domain| {
            lower == domain.as_str() || lower == domain.tool_name().to_lowercase()
        })
    }

    /// Canonical lowercase name, also used as the index name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Hr => "hr",
            Domain::Tech => "tech",
            Domain::Finance => "finance",
        }
    }

    /// Display label, also passed to prompts as `agent_type`.
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Hr => "HR",
            Domain::Tech => "Tech",
            Domain::Finance => "Finance",
        }
    }

    /// Name of the classification tool for this domain.
    pub fn tool_name(&self) -> &'static str {
        match self {
            Domain::Hr => "HRAgent",
            Domain::Tech => "TechAgent",
            Domain::Finance => "FinanceAgent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Domain::Hr => "Answers questions related to Human Resources (policies, benefits, etc).",
            Domain::Tech => "Answers Technical Support questions (IT issues, software, etc).",
            Domain::Finance => "Answers questions related to Finance (budget, expenses, etc).",
        }
    }

    pub fn index_name(&self) -> &'static str {
        self.as_str()
    }

    /// One classification tool per domain, in a fixed order.
    pub fn tools() -> Vec<ToolSpec> {
        Self::ALL
            .iter()
            .map(|d| ToolSpec::with_query_argument(d.tool_name(), d.description()))
            .collect()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Domain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Unknown domain '{}'. Expected one of: hr, tech, finance",
                s
            ))
        })
    }
}

impl TryFrom<String> for Domain {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown domain '{}'", value))
    }
}
