//! Structured conflict detection among critic outputs.
//!
//! Runs independently of the aggregator over the same outputs. Four checks
//! always run: opposing verdicts, confidence divergence, priority conflict
//! and weighted disagreement. ERROR outputs take no part in any check.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::domain::models::critic_output::{population_variance, scored_outputs};
use crate::domain::models::{
    Conflict, ConflictConfig, ConflictSeverity, ConflictSummary, ConflictType, CriticOutput,
    CriticPosition, Verdict,
};

/// Detects disagreement patterns that make a combined verdict unsafe to
/// trust blindly.
#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    config: ConflictConfig,
}

impl ConflictDetector {
    pub fn new(config: ConflictConfig) -> Self {
        Self { config }
    }

    /// Run every check and collect the conflicts found.
    pub fn detect(&self, outputs: &[CriticOutput]) -> Vec<Conflict> {
        let scored: Vec<&CriticOutput> = sorted_scored(outputs);

        let conflicts: Vec<Conflict> = [
            self.check_opposing_verdicts(&scored),
            self.check_confidence_divergence(&scored),
            self.check_priority_conflict(&scored),
            self.check_weighted_disagreement(&scored),
        ]
        .into_iter()
        .flatten()
        .collect();

        debug!(
            critics = scored.len(),
            conflicts = conflicts.len(),
            "Conflict detection finished"
        );

        conflicts
    }

    /// ALLOW and BLOCK both present.
    fn check_opposing_verdicts(&self, scored: &[&CriticOutput]) -> Option<Conflict> {
        let allow: Vec<&CriticOutput> = with_verdict(scored, Verdict::Allow);
        let block: Vec<&CriticOutput> = with_verdict(scored, Verdict::Block);

        if allow.is_empty() || block.is_empty() {
            return None;
        }

        let allow_mean = mean_confidence(&allow);
        let block_mean = mean_confidence(&block);
        let combined = (allow_mean + block_mean) / 2.0;
        let severity = ConflictSeverity::from_confidence(combined);

        let involved: Vec<&CriticOutput> = allow.iter().chain(block.iter()).copied().collect();

        Some(build_conflict(
            ConflictType::OpposingVerdicts,
            severity,
            &involved,
            BTreeMap::from([
                ("allow_count".to_string(), allow.len() as f64),
                ("block_count".to_string(), block.len() as f64),
                ("allow_mean_confidence".to_string(), allow_mean),
                ("block_mean_confidence".to_string(), block_mean),
                ("combined_confidence".to_string(), combined),
            ]),
            format!(
                "{} critic(s) allow and {} block; route to human review with both justifications",
                allow.len(),
                block.len()
            ),
        ))
    }

    /// Confidence spread and variance both above their thresholds.
    fn check_confidence_divergence(&self, scored: &[&CriticOutput]) -> Option<Conflict> {
        if scored.len() < 2 {
            return None;
        }

        let confidences: Vec<f64> = scored.iter().map(|o| o.effective_confidence()).collect();
        let max = confidences.iter().copied().fold(f64::MIN, f64::max);
        let min = confidences.iter().copied().fold(f64::MAX, f64::min);
        let gap = max - min;
        let variance = population_variance(&confidences);

        if gap < self.config.min_confidence_gap
            || variance < self.config.confidence_divergence_threshold
        {
            return None;
        }

        let severity = if variance > self.config.high_divergence_variance {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };

        Some(build_conflict(
            ConflictType::ConfidenceDivergence,
            severity,
            scored,
            BTreeMap::from([
                ("max_confidence".to_string(), max),
                ("min_confidence".to_string(), min),
                ("confidence_gap".to_string(), gap),
                ("confidence_variance".to_string(), variance),
            ]),
            format!(
                "Critic confidence spans {min:.2}..{max:.2}; check whether low-confidence critics lack context"
            ),
        ))
    }

    /// Two or more override critics that do not agree.
    fn check_priority_conflict(&self, scored: &[&CriticOutput]) -> Option<Conflict> {
        let overrides: Vec<&CriticOutput> = scored.iter().copied().filter(|o| o.is_override()).collect();
        if overrides.len() < 2 {
            return None;
        }

        let verdicts: BTreeSet<Verdict> = overrides.iter().map(|o| o.verdict).collect();
        if verdicts.len() < 2 {
            return None;
        }

        Some(build_conflict(
            ConflictType::PriorityConflict,
            ConflictSeverity::Critical,
            &overrides,
            BTreeMap::from([
                ("override_count".to_string(), overrides.len() as f64),
                ("distinct_verdicts".to_string(), verdicts.len() as f64),
            ]),
            "Override critics disagree; escalate to a human adjudicator".to_string(),
        ))
    }

    /// Weighted scores per verdict (REVIEW aside) are close to each other.
    fn check_weighted_disagreement(&self, scored: &[&CriticOutput]) -> Option<Conflict> {
        let mut terms: BTreeMap<Verdict, Vec<f64>> = BTreeMap::new();
        for output in scored.iter().filter(|o| o.verdict != Verdict::Review) {
            terms.entry(output.verdict).or_default().push(output.weighted_score());
        }

        let scores: BTreeMap<Verdict, f64> = terms
            .into_iter()
            .map(|(verdict, mut values)| {
                values.sort_by(f64::total_cmp);
                (verdict, values.iter().sum::<f64>())
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        if scores.len() < 2 {
            return None;
        }

        let max = scores.values().copied().fold(f64::MIN, f64::max);
        let min = scores.values().copied().fold(f64::MAX, f64::min);
        let ratio = min / max;

        if ratio < self.config.weighted_disagreement_threshold {
            return None;
        }

        let involved: Vec<&CriticOutput> = scored
            .iter()
            .copied()
            .filter(|o| scores.contains_key(&o.verdict))
            .collect();

        let mut metrics: BTreeMap<String, f64> = scores
            .iter()
            .map(|(verdict, score)| (format!("score_{}", verdict.as_str().to_lowercase()), *score))
            .collect();
        metrics.insert("score_min".to_string(), min);
        metrics.insert("score_max".to_string(), max);
        metrics.insert("score_ratio".to_string(), ratio);

        Some(build_conflict(
            ConflictType::WeightedDisagreement,
            ConflictSeverity::Medium,
            &involved,
            metrics,
            format!("Weighted support is nearly balanced (ratio {ratio:.2}); gather more evidence"),
        ))
    }

    /// Whether any detected conflict is CRITICAL.
    pub fn has_critical_conflicts(conflicts: &[Conflict]) -> bool {
        conflicts
            .iter()
            .any(|c| c.severity == ConflictSeverity::Critical)
    }

    /// Counts by type and severity, union of involved critics, escalation flag.
    pub fn summarize(conflicts: &[Conflict]) -> ConflictSummary {
        ConflictSummary::from_conflicts(conflicts)
    }
}

/// Non-ERROR outputs ordered by critic name so conflict records are stable.
fn sorted_scored(outputs: &[CriticOutput]) -> Vec<&CriticOutput> {
    let mut scored: Vec<&CriticOutput> = scored_outputs(outputs).collect();
    scored.sort_by(|a, b| a.critic_name.cmp(&b.critic_name));
    scored
}

fn with_verdict<'a>(scored: &[&'a CriticOutput], verdict: Verdict) -> Vec<&'a CriticOutput> {
    scored.iter().copied().filter(|o| o.verdict == verdict).collect()
}

fn mean_confidence(outputs: &[&CriticOutput]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    outputs.iter().map(|o| o.effective_confidence()).sum::<f64>() / outputs.len() as f64
}

fn build_conflict(
    conflict_type: ConflictType,
    severity: ConflictSeverity,
    involved: &[&CriticOutput],
    metrics: BTreeMap<String, f64>,
    resolution_suggestion: String,
) -> Conflict {
    Conflict {
        conflict_type,
        severity,
        involved_critics: involved.iter().map(|o| o.critic_name.clone()).collect(),
        positions: involved.iter().map(|o| CriticPosition::from(*o)).collect(),
        metrics,
        resolution_suggestion,
    }
}
