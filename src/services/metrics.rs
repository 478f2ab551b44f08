//! Metrics document consumed by policy rules.
//!
//! Rules address values by dot path, e.g. `conflicts.critical` or
//! `aggregation.scores.BLOCK`. The top-level `avg_confidence`, `ambiguity`
//! and `overall_verdict` keys are shorthands for the aggregation values.

use serde_json::{json, Map, Value};

use crate::domain::models::{
    AggregationResult, ConflictSeverity, ConflictSummary, CriticOutput, Precedent,
};

/// Build the metrics document for one evaluation.
pub fn build_metrics(
    aggregation: &AggregationResult,
    conflicts: &ConflictSummary,
    outputs: &[CriticOutput],
    precedents: &[Precedent],
) -> Value {
    let scores: Map<String, Value> = aggregation
        .verdict_scores
        .iter()
        .map(|(verdict, score)| (verdict.as_str().to_string(), json!(score)))
        .collect();

    let count = outputs.len();
    let error_count = outputs.iter().filter(|o| o.is_error()).count();
    let error_rate = if count == 0 {
        0.0
    } else {
        error_count as f64 / count as f64
    };

    json!({
        "avg_confidence": aggregation.avg_confidence,
        "ambiguity": aggregation.ambiguity,
        "overall_verdict": aggregation.overall_verdict.as_str(),
        "aggregation": {
            "overall_verdict": aggregation.overall_verdict.as_str(),
            "avg_confidence": aggregation.avg_confidence,
            "ambiguity": aggregation.ambiguity,
            "override_applied": aggregation.override_applied,
            "degenerate": aggregation.degenerate,
            "scores": scores,
        },
        "conflicts": {
            "count": conflicts.total,
            "critical": conflicts.count_severity(ConflictSeverity::Critical),
            "high": conflicts.count_severity(ConflictSeverity::High),
            "requires_escalation": conflicts.requires_escalation,
        },
        "critics": {
            "count": count,
            "error_count": error_count,
            "error_rate": error_rate,
            "override_count": outputs.iter().filter(|o| o.is_override()).count(),
        },
        "precedents": {
            "count": precedents.len(),
            "alignment": precedent_alignment(aggregation, precedents),
        },
    })
}

/// Similarity-weighted share of precedents that reached the same verdict.
///
/// 0 when there are no precedents or all similarities are 0.
pub fn precedent_alignment(aggregation: &AggregationResult, precedents: &[Precedent]) -> f64 {
    let similarity = |p: &Precedent| {
        if p.similarity.is_nan() {
            0.0
        } else {
            p.similarity.clamp(0.0, 1.0)
        }
    };

    let total: f64 = precedents.iter().map(similarity).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let agreeing: f64 = precedents
        .iter()
        .filter(|p| p.verdict == aggregation.overall_verdict)
        .map(similarity)
        .sum();
    agreeing / total
}
