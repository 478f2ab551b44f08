use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{Case, Precedent};

/// Error type for precedent lookups
#[derive(Debug, Clone, Error)]
pub enum PrecedentError {
    #[error("Precedent store unavailable: {0}")]
    Unavailable(String),

    #[error("Precedent query failed: {0}")]
    QueryFailed(String),
}

/// Read-only access to previously decided cases.
///
/// Precedents are context only; aggregation correctness never depends on them.
#[async_trait]
pub trait PrecedentLookup: Send + Sync {
    async fn lookup(&self, case: &Case) -> Result<Vec<Precedent>, PrecedentError>;
}
