//! Domain errors for the Tribunal governance pipeline.

use thiserror::Error;

/// Domain-level errors that can surface to callers of the pipeline.
///
/// Quality-of-decision problems (failed critics, broken rules, zero usable
/// verdicts) never appear here; they are folded into the decision bundle.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Policy configuration error: {0}")]
    PolicyConfiguration(#[from] PolicyConfigError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Programmer-configuration errors in a policy rule set.
///
/// These abort engine construction before any case is evaluated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyConfigError {
    #[error("Unknown comparison operator '{0}'. Expected one of: >=, >, <=, <, ==, !=")]
    UnknownOperator(String),

    #[error("Rule name cannot be empty")]
    EmptyRuleName,

    #[error("Rule '{0}' has an empty metric path")]
    EmptyMetricPath(String),

    #[error("Duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("Rule '{rule}' uses ordering operator '{operator}' with a non-numeric threshold")]
    NonNumericThreshold { rule: String, operator: String },
}

/// Errors raised while evaluating a single policy rule.
///
/// Contained to the rule's result slot: the rule reports `triggered = false`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error("Metric '{0}' not found")]
    MissingMetric(String),

    #[error("Metric '{path}' has type {found}, expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Predicate failed: {0}")]
    PredicateFailed(String),
}
