//! Critic output domain model.

use serde::{Deserialize, Serialize};

use super::verdict::{CriticPriority, Verdict};

/// One critic's verdict on one case.
///
/// Produced once per critic per case by the executor and never mutated.
/// Raw `confidence` and `weight` are kept for audit; analysis code must read
/// them through [`CriticOutput::effective_confidence`] and
/// [`CriticOutput::effective_weight`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticOutput {
    pub critic_name: String,
    pub verdict: Verdict,
    pub confidence: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub priority: CriticPriority,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    /// Number of invocation attempts made (0 for synthetic outputs)
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub latency_ms: u64,
}

const fn default_weight() -> f64 {
    1.0
}

impl CriticOutput {
    pub fn new(critic_name: impl Into<String>, verdict: Verdict, confidence: f64) -> Self {
        Self {
            critic_name: critic_name.into(),
            verdict,
            confidence,
            weight: default_weight(),
            priority: CriticPriority::None,
            justification: String::new(),
            risk_flags: Vec::new(),
            attempts: 0,
            latency_ms: 0,
        }
    }

    /// ERROR slot for a critic that could not produce a verdict.
    pub fn error(critic_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            justification: reason.into(),
            ..Self::new(critic_name, Verdict::Error, 0.0)
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_priority(mut self, priority: CriticPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = justification.into();
        self
    }

    pub fn with_risk_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.risk_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Confidence clamped to `[0, 1]`; ERROR and NaN read as 0.
    pub fn effective_confidence(&self) -> f64 {
        if self.verdict.is_error() || self.confidence.is_nan() {
            return 0.0;
        }
        self.confidence.clamp(0.0, 1.0)
    }

    /// Weight clamped to `[0, ∞)`; NaN reads as 0.
    pub fn effective_weight(&self) -> f64 {
        if self.weight.is_nan() {
            return 0.0;
        }
        self.weight.max(0.0)
    }

    /// `confidence × weight` after clamping.
    pub fn weighted_score(&self) -> f64 {
        self.effective_confidence() * self.effective_weight()
    }

    pub fn is_error(&self) -> bool {
        self.verdict.is_error()
    }

    pub fn is_override(&self) -> bool {
        self.priority.is_override()
    }
}

/// Outputs that carry a usable verdict.
pub fn scored_outputs(outputs: &[CriticOutput]) -> impl Iterator<Item = &CriticOutput> {
    outputs.iter().filter(|o| !o.is_error())
}

/// Population variance; 0 for fewer than two samples.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
