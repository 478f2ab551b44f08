//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tribunal::domain::models::{Case, Config, CriticPriority, Precedent, Verdict};
use tribunal::domain::ports::{Critic, PrecedentError, PrecedentLookup};
use tribunal::infrastructure::critics::{FailureKind, ScriptedCritic, ScriptedFailure};

/// Configuration with millisecond backoffs so retry paths stay fast.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.executor.critic_timeout_ms = 2_000;
    config.executor.retry.retry_backoff_min_ms = 1;
    config.executor.retry.retry_backoff_max_ms = 5;
    config
}

pub fn returning(name: &str, verdict: Verdict, confidence: f64) -> Arc<dyn Critic> {
    Arc::new(ScriptedCritic::returning(name, verdict, confidence))
}

pub fn rejecting(name: &str) -> Arc<dyn Critic> {
    Arc::new(ScriptedCritic::failing(
        name,
        ScriptedFailure::new(FailureKind::Rejected, "HTTP 400: bad request"),
    ))
}

pub fn with_override(mut config: Config, critic: &str) -> Config {
    config
        .panel
        .critic_priorities
        .insert(critic.to_string(), CriticPriority::Override);
    config
}

pub fn sample_case() -> Case {
    Case::new("Should the assistant share the requested medication dosage?")
}

/// Precedent store returning the same matches for every case.
pub struct FixedPrecedents(pub Vec<Precedent>);

#[async_trait]
impl PrecedentLookup for FixedPrecedents {
    async fn lookup(&self, _case: &Case) -> Result<Vec<Precedent>, PrecedentError> {
        Ok(self.0.clone())
    }
}

pub fn precedent(case_id: &str, verdict: Verdict, similarity: f64) -> Precedent {
    Precedent {
        case_id: case_id.to_string(),
        verdict,
        similarity,
        summary: String::new(),
    }
}
