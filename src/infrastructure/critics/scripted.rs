//! Scripted critic: replays recorded evaluations and failures.
//!
//! Each call consumes the next step; once the script is exhausted the last
//! step repeats. Used for replaying recorded panels from the CLI and in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::models::{Case, Verdict};
use crate::domain::ports::{Critic, CriticError, CriticEvaluation};

/// Failure categories a script can replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Timeout,
    RateLimited,
    Server,
    Malformed,
    Rejected,
}

/// A recorded critic failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedFailure {
    pub kind: FailureKind,
    #[serde(default)]
    pub message: String,
    /// HTTP status for `server` failures
    #[serde(default)]
    pub status: Option<u16>,
    /// Elapsed time for `timeout` failures
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ScriptedFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            timeout_ms: None,
        }
    }

    pub fn to_error(&self) -> CriticError {
        match self.kind {
            FailureKind::Connection => CriticError::Connection(self.message.clone()),
            FailureKind::Timeout => {
                CriticError::Timeout(Duration::from_millis(self.timeout_ms.unwrap_or_default()))
            }
            FailureKind::RateLimited => CriticError::RateLimited,
            FailureKind::Server => CriticError::Server {
                status: self.status.unwrap_or(500),
                message: self.message.clone(),
            },
            FailureKind::Malformed => CriticError::Malformed(self.message.clone()),
            FailureKind::Rejected => CriticError::Rejected(self.message.clone()),
        }
    }
}

/// One step of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptedStep {
    Evaluation(CriticEvaluation),
    Failure(ScriptedFailure),
}

impl ScriptedStep {
    fn replay(&self) -> Result<CriticEvaluation, CriticError> {
        match self {
            Self::Evaluation(evaluation) => Ok(evaluation.clone()),
            Self::Failure(failure) => Err(failure.to_error()),
        }
    }
}

/// Critic that replays a fixed script.
#[derive(Debug)]
pub struct ScriptedCritic {
    name: String,
    steps: Vec<ScriptedStep>,
    cursor: AtomicUsize,
}

impl ScriptedCritic {
    pub fn new(name: impl Into<String>, steps: Vec<ScriptedStep>) -> Self {
        Self {
            name: name.into(),
            steps,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Always returns the same verdict.
    pub fn returning(name: impl Into<String>, verdict: Verdict, confidence: f64) -> Self {
        let name = name.into();
        let justification = format!("{name} recorded {verdict}");
        Self::new(
            name,
            vec![ScriptedStep::Evaluation(CriticEvaluation::new(
                verdict,
                confidence,
                justification,
            ))],
        )
    }

    /// Always fails the same way.
    pub fn failing(name: impl Into<String>, failure: ScriptedFailure) -> Self {
        Self::new(name, vec![ScriptedStep::Failure(failure)])
    }

    /// Number of evaluations served so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Critic for ScriptedCritic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
        let call = self.cursor.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.steps.len().saturating_sub(1));
        self.steps.get(index).map_or_else(
            || Err(CriticError::Malformed(format!("critic '{}' has an empty script", self.name))),
            ScriptedStep::replay,
        )
    }
}
