//! Dissent analysis and review triage models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::case::Case;
use super::verdict::Verdict;

/// Shape of the verdict distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisagreementType {
    Unanimous,
    StrongMajority,
    Majority,
    Deadlock,
    Split,
}

/// Entropy-based view of how much the panel disagrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DissentAnalysis {
    pub dissent_index: f64,
    pub majority_verdict: Option<Verdict>,
    pub minority_verdicts: Vec<Verdict>,
    /// Share of outputs backing the majority verdict
    pub split_ratio: f64,
    pub disagreement_type: DisagreementType,
    pub reasoning_divergence: f64,
    pub conflicting_principles: Vec<String>,
}

/// Human-review urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Severity of a rights-impact finding attached to a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RightsImpact {
    pub right: String,
    pub severity: ImpactSeverity,
}

/// Case-level facts that raise review urgency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageContext {
    pub high_stakes: bool,
    #[serde(default)]
    pub rights_impacts: Vec<RightsImpact>,
}

/// Context keys that mark a case as high stakes when set to `true`.
pub const HIGH_STAKES_FLAGS: [&str; 4] =
    ["high_stakes", "privacy_sensitive", "safety_critical", "legal_risk"];

impl TriageContext {
    /// Derive triage facts from the case context.
    ///
    /// `rights_impacts` entries that fail to parse are ignored.
    pub fn from_case(case: &Case) -> Self {
        let high_stakes = HIGH_STAKES_FLAGS.iter().any(|flag| case.context_flag(flag));

        let rights_impacts = case
            .context
            .get("rights_impacts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            high_stakes,
            rights_impacts,
        }
    }

    pub fn has_critical_rights_impact(&self) -> bool {
        self.rights_impacts
            .iter()
            .any(|impact| impact.severity == ImpactSeverity::Critical)
    }
}

/// Triage metadata attached to cases routed to human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewTriage {
    pub dissent: DissentAnalysis,
    pub priority: ReviewPriority,
    pub high_stakes: bool,
    pub reasons: Vec<String>,
}
