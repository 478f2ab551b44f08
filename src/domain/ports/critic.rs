//! Critic Port
//!
//! A critic is an opaque judgment source. The governance pipeline never knows
//! how a critic reaches its verdict; it only sees the typed success or failure
//! returned here and feeds failures to the retry policy as data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::models::{Case, Verdict};

/// What a critic returns on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticEvaluation {
    pub verdict: Verdict,
    pub confidence: f64,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

impl CriticEvaluation {
    pub fn new(verdict: Verdict, confidence: f64, justification: impl Into<String>) -> Self {
        Self {
            verdict,
            confidence,
            justification: justification.into(),
            risk_flags: Vec::new(),
        }
    }
}

/// Typed critic failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CriticError {
    /// Network or connection failure
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The attempt exceeded its deadline
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The critic asked us to slow down
    #[error("Rate limited")]
    RateLimited,

    /// The critic backend failed on its side
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The critic answered, but not with a usable evaluation
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The critic refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl CriticError {
    /// Connection/timeout-class failures are worth another attempt.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::RateLimited | Self::Server { .. }
        )
    }
}

/// An independent judgment source registered with the panel.
///
/// Critics are registered statically at startup and shared across cases;
/// implementations must not keep per-case state.
#[async_trait]
pub trait Critic: Send + Sync {
    /// Stable name used for weights, priorities and audit
    fn name(&self) -> &str;

    /// Judge a case
    async fn evaluate(&self, case: &Case) -> Result<CriticEvaluation, CriticError>;
}
