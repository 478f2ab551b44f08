//! Conflict records produced by the conflict detector.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::critic_output::CriticOutput;
use super::verdict::{CriticPriority, Verdict};

/// Kind of structured disagreement among critics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    OpposingVerdicts,
    ConfidenceDivergence,
    PriorityConflict,
    WeightedDisagreement,
}

impl ConflictType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpposingVerdicts => "OPPOSING_VERDICTS",
            Self::ConfidenceDivergence => "CONFIDENCE_DIVERGENCE",
            Self::PriorityConflict => "PRIORITY_CONFLICT",
            Self::WeightedDisagreement => "WEIGHTED_DISAGREEMENT",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conflict severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    /// Map a mean confidence onto a severity band.
    pub fn from_confidence(mean_confidence: f64) -> Self {
        if mean_confidence > 0.8 {
            Self::Critical
        } else if mean_confidence > 0.6 {
            Self::High
        } else if mean_confidence > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn requires_escalation(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A critic's stance as recorded in a conflict, for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticPosition {
    pub critic_name: String,
    pub verdict: Verdict,
    pub confidence: f64,
    pub weight: f64,
    pub priority: CriticPriority,
}

impl From<&CriticOutput> for CriticPosition {
    fn from(output: &CriticOutput) -> Self {
        Self {
            critic_name: output.critic_name.clone(),
            verdict: output.verdict,
            confidence: output.effective_confidence(),
            weight: output.effective_weight(),
            priority: output.priority,
        }
    }
}

/// A detected disagreement among critics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    pub involved_critics: Vec<String>,
    pub positions: Vec<CriticPosition>,
    pub metrics: BTreeMap<String, f64>,
    pub resolution_suggestion: String,
}

/// Read-only roll-up of a conflict set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSummary {
    pub total: usize,
    pub by_type: BTreeMap<ConflictType, usize>,
    pub by_severity: BTreeMap<ConflictSeverity, usize>,
    pub involved_critics: BTreeSet<String>,
    pub requires_escalation: bool,
    pub has_critical: bool,
}

impl ConflictSummary {
    pub fn from_conflicts(conflicts: &[Conflict]) -> Self {
        let mut summary = Self {
            total: conflicts.len(),
            ..Self::default()
        };

        for conflict in conflicts {
            *summary.by_type.entry(conflict.conflict_type).or_insert(0) += 1;
            *summary.by_severity.entry(conflict.severity).or_insert(0) += 1;
            summary
                .involved_critics
                .extend(conflict.involved_critics.iter().cloned());
            summary.requires_escalation |= conflict.severity.requires_escalation();
            summary.has_critical |= conflict.severity == ConflictSeverity::Critical;
        }

        summary
    }

    pub fn count_severity(&self, severity: ConflictSeverity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}
