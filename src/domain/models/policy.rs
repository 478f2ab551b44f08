//! Policy rule results and actions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::verdict::Verdict;

/// Action recommended by a policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAction {
    #[serde(alias = "deny", alias = "BLOCK", alias = "block")]
    Deny,
    #[serde(alias = "escalate")]
    Escalate,
    #[serde(alias = "review")]
    Review,
    #[serde(alias = "warn")]
    Warn,
    #[serde(alias = "allow")]
    Allow,
}

impl PolicyAction {
    /// Fixed precedence: `DENY > ESCALATE > REVIEW > WARN > ALLOW`.
    pub const fn precedence(&self) -> u8 {
        match self {
            Self::Deny => 4,
            Self::Escalate => 3,
            Self::Review => 2,
            Self::Warn => 1,
            Self::Allow => 0,
        }
    }

    pub fn most_restrictive(self, other: Self) -> Self {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    /// Whether the action routes the case to human review.
    pub const fn needs_review(&self) -> bool {
        matches!(self, Self::Review | Self::Escalate)
    }

    /// Minimum action implied by an aggregated verdict.
    pub const fn floor_for(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Block => Self::Deny,
            Verdict::Review | Verdict::Abstain | Verdict::Error => Self::Review,
            Verdict::Allow => Self::Allow,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deny => "DENY",
            Self::Escalate => "ESCALATE",
            Self::Review => "REVIEW",
            Self::Warn => "WARN",
            Self::Allow => "ALLOW",
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule priority, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RulePriority {
    #[serde(alias = "advisory")]
    Advisory,
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
    #[serde(alias = "critical")]
    Critical,
}

impl fmt::Display for RulePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Advisory => "ADVISORY",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Outcome of one rule in one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRuleResult {
    pub rule_name: String,
    pub triggered: bool,
    /// False when the rule was skipped by a critical short-circuit
    pub evaluated: bool,
    pub action: PolicyAction,
    pub priority: RulePriority,
    pub reason: String,
    pub confidence: f64,
}

impl PolicyRuleResult {
    /// Result for a rule that was skipped after a critical trigger.
    pub fn not_evaluated(
        rule_name: impl Into<String>,
        action: PolicyAction,
        priority: RulePriority,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            triggered: false,
            evaluated: false,
            action,
            priority,
            reason: "Not evaluated: skipped after a critical rule triggered".to_string(),
            confidence: 0.0,
        }
    }
}

/// Results of evaluating a whole rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub results: Vec<PolicyRuleResult>,
    pub recommended_action: PolicyAction,
    pub triggered_rules: Vec<String>,
    pub stopped_early: bool,
}

impl PolicyEvaluation {
    pub fn result(&self, rule_name: &str) -> Option<&PolicyRuleResult> {
        self.results.iter().find(|r| r.rule_name == rule_name)
    }
}
