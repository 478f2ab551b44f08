//! Case domain model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Default upper bound on case text length, in characters.
pub const DEFAULT_MAX_CASE_LENGTH: usize = 100_000;

/// A submitted case awaiting a governed decision.
///
/// Cases are immutable once submitted; every pipeline stage borrows them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Caller-visible identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// The text under judgment
    pub text: String,

    /// Optional structured context (jurisdiction, stakes, rights impacts, ...)
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl Case {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Deterministic content hash of the case.
    ///
    /// Covers text and context only; the id is excluded so that a resubmitted
    /// case maps to the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::json!({
            "text": self.text,
            "context": self.context,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Reject malformed cases before any critic is invoked.
    pub fn validate(&self, max_length: usize) -> DomainResult<()> {
        if self.text.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "case text cannot be empty".to_string(),
            ));
        }

        let length = self.text.chars().count();
        if length > max_length {
            return Err(DomainError::ValidationFailed(format!(
                "case text is {length} characters, exceeding the limit of {max_length}"
            )));
        }

        if self.context.keys().any(|k| k.trim().is_empty()) {
            return Err(DomainError::ValidationFailed(
                "case context keys cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Read a boolean flag from the context; missing or non-boolean is false.
    pub fn context_flag(&self, key: &str) -> bool {
        self.context
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
