//! Decision bundle: the complete, explainable result of one evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregation::AggregationResult;
use super::conflict::{Conflict, ConflictSummary};
use super::critic_output::CriticOutput;
use super::dissent::ReviewTriage;
use super::policy::{PolicyAction, PolicyEvaluation};
use super::verdict::Verdict;

/// A previously decided case returned by the precedent collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precedent {
    pub case_id: String,
    pub verdict: Verdict,
    /// Similarity to the current case in `[0, 1]`
    pub similarity: f64,
    #[serde(default)]
    pub summary: String,
}

/// Everything derived for one case evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBundle {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub case_id: Uuid,
    pub case_fingerprint: String,
    pub critic_outputs: Vec<CriticOutput>,
    pub aggregation_result: AggregationResult,
    pub conflicts: Vec<Conflict>,
    pub conflict_summary: ConflictSummary,
    pub policy_result: PolicyEvaluation,
    pub final_action: PolicyAction,
    pub triage: Option<ReviewTriage>,
    #[serde(default)]
    pub precedents: Vec<Precedent>,
    pub from_cache: bool,
}

impl DecisionBundle {
    /// Copy of a cached bundle re-issued under a fresh request id.
    pub fn reissued(&self, case_id: Uuid) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            case_id,
            from_cache: true,
            ..self.clone()
        }
    }

    pub fn error_count(&self) -> usize {
        self.critic_outputs.iter().filter(|o| o.is_error()).count()
    }

    pub fn overall_verdict(&self) -> Verdict {
        self.aggregation_result.overall_verdict
    }
}
