use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::verdict::Verdict;

/// The combined outcome of one critic panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub overall_verdict: Verdict,
    pub reason: String,
    /// Σ(confidence × weight) per verdict over non-ERROR outputs
    pub verdict_scores: BTreeMap<Verdict, f64>,
    pub avg_confidence: f64,
    /// Population variance of the non-ERROR confidences
    pub ambiguity: f64,
    /// True when an override critic fixed the verdict
    #[serde(default)]
    pub override_applied: bool,
    /// True when no usable verdict existed and the safe default was returned
    #[serde(default)]
    pub degenerate: bool,
}

impl AggregationResult {
    pub fn score(&self, verdict: Verdict) -> f64 {
        self.verdict_scores.get(&verdict).copied().unwrap_or(0.0)
    }

    pub fn total_score(&self) -> f64 {
        self.verdict_scores.values().sum()
    }
}
