//! Weighted verdict aggregation.
//!
//! Pipeline, in order:
//! 1. Σ(confidence × weight) per verdict over non-ERROR outputs
//! 2. Override short-circuit for non-ALLOW override critics
//! 3. argmax with conservative tie-break (BLOCK > REVIEW > ALLOW > ABSTAIN)
//! 4. Ambiguity escalation to REVIEW (a unanimous panel keeps its verdict)
//! 5. BLOCK safety floor
//!
//! Empty or all-ERROR panels take the configured safe default.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::models::critic_output::{population_variance, scored_outputs};
use crate::domain::models::{AggregationConfig, AggregationResult, CriticOutput, Verdict};

/// Combines critic outputs into one verdict.
///
/// Pure: the same outputs in any order produce the same result.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn aggregate(&self, outputs: &[CriticOutput]) -> AggregationResult {
        let scored: Vec<&CriticOutput> = scored_outputs(outputs).collect();

        if scored.is_empty() {
            return self.degenerate(outputs.len());
        }

        let verdict_scores = verdict_scores(&scored);
        let mut confidences: Vec<f64> = scored.iter().map(|o| o.effective_confidence()).collect();
        confidences.sort_by(f64::total_cmp);
        let avg_confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;
        let ambiguity = population_variance(&confidences);

        if let Some((verdict, critic)) = resolve_override(&scored, &verdict_scores) {
            debug!(%verdict, critic, "Override critic fixed the verdict");
            return AggregationResult {
                overall_verdict: verdict,
                reason: format!("Override by {critic}"),
                verdict_scores,
                avg_confidence,
                ambiguity,
                override_applied: true,
                degenerate: false,
            };
        }

        let mut overall = argmax(&verdict_scores).unwrap_or(Verdict::Abstain);
        let mut reason = format!(
            "Weighted majority: {overall} scored {:.3}",
            verdict_scores.get(&overall).copied().unwrap_or(0.0)
        );

        let distinct_positions = distinct_verdicts(&scored);
        let unanimous = scored.iter().all(|o| o.verdict == scored[0].verdict);
        if !unanimous && ambiguity > self.config.ambiguity_threshold {
            overall = Verdict::Review;
            reason = format!(
                "Ambiguity {ambiguity:.3} exceeds threshold {:.3}",
                self.config.ambiguity_threshold
            );
        } else if distinct_positions > 1 {
            overall = Verdict::Review;
            reason = format!("Critics split across {distinct_positions} verdicts");
        }

        let block_score = verdict_scores.get(&Verdict::Block).copied().unwrap_or(0.0);
        if block_score >= self.config.block_threshold {
            overall = Verdict::Block;
            reason = format!(
                "Block score {block_score:.3} meets threshold {:.3}",
                self.config.block_threshold
            );
        }

        AggregationResult {
            overall_verdict: overall,
            reason,
            verdict_scores,
            avg_confidence,
            ambiguity,
            override_applied: false,
            degenerate: false,
        }
    }

    fn degenerate(&self, total: usize) -> AggregationResult {
        let verdict = self.config.safe_default();
        let reason = if total == 0 {
            format!("No critic outputs; safe default {verdict}")
        } else {
            format!("All {total} critics failed; safe default {verdict}")
        };

        AggregationResult {
            overall_verdict: verdict,
            reason,
            verdict_scores: BTreeMap::new(),
            avg_confidence: 0.0,
            ambiguity: 0.0,
            override_applied: false,
            degenerate: true,
        }
    }
}

/// Σ(confidence × weight) per verdict.
///
/// Terms are summed in sorted order so the floating-point result does not
/// depend on the order critics completed in.
fn verdict_scores(scored: &[&CriticOutput]) -> BTreeMap<Verdict, f64> {
    let mut terms: BTreeMap<Verdict, Vec<f64>> = BTreeMap::new();
    for output in scored {
        terms.entry(output.verdict).or_default().push(output.weighted_score());
    }

    terms
        .into_iter()
        .map(|(verdict, mut values)| {
            values.sort_by(f64::total_cmp);
            (verdict, values.iter().sum::<f64>())
        })
        .collect()
}

/// Highest score; ties go to the more conservative verdict.
fn argmax(scores: &BTreeMap<Verdict, f64>) -> Option<Verdict> {
    scores
        .iter()
        .max_by(|(va, sa), (vb, sb)| {
            sa.total_cmp(sb)
                .then_with(|| va.conservatism().cmp(&vb.conservatism()))
        })
        .map(|(v, _)| *v)
}

/// Count distinct verdicts among non-ERROR outputs.
fn distinct_verdicts(scored: &[&CriticOutput]) -> usize {
    let mut seen: Vec<Verdict> = scored.iter().map(|o| o.verdict).collect();
    seen.sort();
    seen.dedup();
    seen.len()
}

/// Find the override verdict, if any override critic took a non-ALLOW
/// position.
///
/// Disagreeing overrides resolve to the verdict with the highest aggregated
/// score (conservative tie-break); the credited critic is the one with the
/// highest individual weighted score for that verdict, then by name.
fn resolve_override<'a>(
    scored: &[&'a CriticOutput],
    scores: &BTreeMap<Verdict, f64>,
) -> Option<(Verdict, &'a str)> {
    let overrides: Vec<&CriticOutput> = scored
        .iter()
        .copied()
        .filter(|o| o.is_override() && o.verdict != Verdict::Allow)
        .collect();

    let verdict = overrides
        .iter()
        .map(|o| o.verdict)
        .max_by(|a, b| {
            let sa = scores.get(a).copied().unwrap_or(0.0);
            let sb = scores.get(b).copied().unwrap_or(0.0);
            sa.total_cmp(&sb)
                .then_with(|| a.conservatism().cmp(&b.conservatism()))
        })?;

    let critic = overrides
        .iter()
        .filter(|o| o.verdict == verdict)
        .max_by(|a, b| {
            a.weighted_score()
                .total_cmp(&b.weighted_score())
                .then_with(|| b.critic_name.cmp(&a.critic_name))
        })?;

    Some((verdict, critic.critic_name.as_str()))
}
