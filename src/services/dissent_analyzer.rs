//! Entropy-based dissent analysis and human-review triage.
//!
//! The dissent index is the Shannon entropy of the verdict distribution,
//! normalised by `log2(min(n, 3))` and clamped to `[0, 1]`. ERROR outputs do
//! not vote.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::models::critic_output::scored_outputs;
use crate::domain::models::{
    CriticOutput, DisagreementType, DissentAnalysis, ReviewPriority, ReviewTriage, TriageContext,
    Verdict,
};

const STRONG_MAJORITY_RATIO: f64 = 0.8;
const MAJORITY_RATIO: f64 = 0.6;

const CRITICAL_DISSENT: f64 = 0.8;
const HIGH_DISSENT: f64 = 0.7;
const MEDIUM_DISSENT: f64 = 0.4;

/// Measures how much a panel disagrees and how urgently a human should look.
#[derive(Debug, Clone, Copy, Default)]
pub struct DissentAnalyzer;

impl DissentAnalyzer {
    pub const fn new() -> Self {
        Self
    }

    pub fn analyze(&self, outputs: &[CriticOutput]) -> DissentAnalysis {
        let scored: Vec<&CriticOutput> = scored_outputs(outputs).collect();
        let n = scored.len();

        let mut counts: BTreeMap<Verdict, usize> = BTreeMap::new();
        for output in &scored {
            *counts.entry(output.verdict).or_insert(0) += 1;
        }

        let top_count = counts.values().copied().max().unwrap_or(0);
        let leaders: Vec<Verdict> = counts
            .iter()
            .filter(|(_, count)| **count == top_count)
            .map(|(verdict, _)| *verdict)
            .collect();
        let majority_verdict = leaders.iter().copied().max_by_key(Verdict::conservatism);

        let minority_verdicts = counts
            .keys()
            .copied()
            .filter(|v| Some(*v) != majority_verdict)
            .collect();

        let split_ratio = if n == 0 {
            0.0
        } else {
            top_count as f64 / n as f64
        };

        DissentAnalysis {
            dissent_index: dissent_index(&counts, n),
            majority_verdict,
            minority_verdicts,
            split_ratio,
            disagreement_type: classify(counts.len(), leaders.len(), split_ratio),
            reasoning_divergence: reasoning_divergence(&scored),
            conflicting_principles: conflicting_principles(&scored),
        }
    }

    /// Review priority from dissent and case stakes.
    pub fn triage(&self, dissent: DissentAnalysis, context: &TriageContext) -> ReviewTriage {
        let index = dissent.dissent_index;
        let mut reasons = Vec::new();

        if context.has_critical_rights_impact() {
            reasons.push("Critical rights impact".to_string());
        }
        if context.high_stakes {
            reasons.push("High-stakes case".to_string());
        }
        if index >= MEDIUM_DISSENT {
            reasons.push(format!("Dissent index {index:.2}"));
        }
        if !dissent.conflicting_principles.is_empty() {
            reasons.push(format!(
                "Conflicting principles: {}",
                dissent.conflicting_principles.join(", ")
            ));
        }

        let priority = if (index >= CRITICAL_DISSENT && context.high_stakes)
            || context.has_critical_rights_impact()
        {
            ReviewPriority::Critical
        } else if index >= HIGH_DISSENT || context.high_stakes {
            ReviewPriority::High
        } else if index >= MEDIUM_DISSENT {
            ReviewPriority::Medium
        } else {
            ReviewPriority::Low
        };

        ReviewTriage {
            dissent,
            priority,
            high_stakes: context.high_stakes,
            reasons,
        }
    }
}

fn dissent_index(counts: &BTreeMap<Verdict, usize>, n: usize) -> f64 {
    if n <= 1 || counts.len() <= 1 {
        return 0.0;
    }

    let total = n as f64;
    let entropy: f64 = -counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            p * p.log2()
        })
        .sum::<f64>();

    let max_entropy = (n.min(3) as f64).log2();
    (entropy / max_entropy).clamp(0.0, 1.0)
}

fn classify(distinct: usize, leaders: usize, split_ratio: f64) -> DisagreementType {
    if distinct <= 1 {
        DisagreementType::Unanimous
    } else if split_ratio >= STRONG_MAJORITY_RATIO {
        DisagreementType::StrongMajority
    } else if split_ratio >= MAJORITY_RATIO {
        DisagreementType::Majority
    } else if leaders >= 3 {
        DisagreementType::Deadlock
    } else {
        DisagreementType::Split
    }
}

/// Lower-cased alphanumeric tokens.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    1.0 - intersection as f64 / union as f64
}

/// Mean Jaccard distance between justifications of critics that disagree.
fn reasoning_divergence(scored: &[&CriticOutput]) -> f64 {
    let tokens: Vec<BTreeSet<String>> = scored.iter().map(|o| tokenize(&o.justification)).collect();

    let mut distances = Vec::new();
    for i in 0..scored.len() {
        for j in (i + 1)..scored.len() {
            if scored[i].verdict != scored[j].verdict {
                distances.push(jaccard_distance(&tokens[i], &tokens[j]));
            }
        }
    }

    if distances.is_empty() {
        return 0.0;
    }
    distances.sort_by(f64::total_cmp);
    distances.iter().sum::<f64>() / distances.len() as f64
}

/// Risk flags raised by both ALLOW and BLOCK voters.
fn conflicting_principles(scored: &[&CriticOutput]) -> Vec<String> {
    let flags_for = |verdict: Verdict| -> BTreeSet<&str> {
        scored
            .iter()
            .filter(|o| o.verdict == verdict)
            .flat_map(|o| o.risk_flags.iter().map(String::as_str))
            .collect()
    };

    let allow = flags_for(Verdict::Allow);
    let block = flags_for(Verdict::Block);
    allow.intersection(&block).map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Case, ImpactSeverity, RightsImpact};

    fn out(name: &str, verdict: Verdict) -> CriticOutput {
        CriticOutput::new(name, verdict, 0.8)
    }

    #[test]
    fn test_unanimous_panel() {
        let outputs = vec![
            out("a", Verdict::Allow),
            out("b", Verdict::Allow),
            out("c", Verdict::Allow),
        ];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert!(analysis.dissent_index.abs() < f64::EPSILON);
        assert_eq!(analysis.majority_verdict, Some(Verdict::Allow));
        assert!(analysis.minority_verdicts.is_empty());
        assert_eq!(analysis.disagreement_type, DisagreementType::Unanimous);
        assert!((analysis.split_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_three_way_split_is_maximal_deadlock() {
        let outputs = vec![
            out("a", Verdict::Allow),
            out("b", Verdict::Block),
            out("c", Verdict::Review),
        ];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert!((analysis.dissent_index - 1.0).abs() < 1e-9);
        assert_eq!(analysis.disagreement_type, DisagreementType::Deadlock);
        assert_eq!(analysis.majority_verdict, Some(Verdict::Block));
    }

    #[test]
    fn test_even_pair_split() {
        let outputs = vec![out("a", Verdict::Allow), out("b", Verdict::Block)];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert!((analysis.dissent_index - 1.0).abs() < 1e-9);
        assert_eq!(analysis.disagreement_type, DisagreementType::Split);
        assert_eq!(analysis.minority_verdicts, vec![Verdict::Allow]);
    }

    #[test]
    fn test_majority_bands() {
        let mut outputs: Vec<CriticOutput> =
            (0..4).map(|i| out(&format!("a{i}"), Verdict::Allow)).collect();
        outputs.push(out("b", Verdict::Block));
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert_eq!(analysis.disagreement_type, DisagreementType::StrongMajority);

        let outputs = vec![
            out("a", Verdict::Allow),
            out("b", Verdict::Allow),
            out("c", Verdict::Allow),
            out("d", Verdict::Block),
            out("e", Verdict::Block),
        ];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert_eq!(analysis.disagreement_type, DisagreementType::Majority);
        assert!(analysis.dissent_index > 0.0 && analysis.dissent_index <= 1.0);
    }

    #[test]
    fn test_errors_do_not_vote() {
        let outputs = vec![out("a", Verdict::Allow), CriticOutput::error("b", "down")];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert!(analysis.dissent_index.abs() < f64::EPSILON);
        assert_eq!(analysis.disagreement_type, DisagreementType::Unanimous);
    }

    #[test]
    fn test_empty_panel() {
        let analysis = DissentAnalyzer::new().analyze(&[]);
        assert!(analysis.dissent_index.abs() < f64::EPSILON);
        assert_eq!(analysis.majority_verdict, None);
        assert!(analysis.split_ratio.abs() < f64::EPSILON);
    }

    #[test]
    fn test_reasoning_divergence() {
        let outputs = vec![
            out("a", Verdict::Allow).with_justification("Harmless cooking advice"),
            out("b", Verdict::Allow).with_justification("Totally unrelated words"),
            out("c", Verdict::Block).with_justification("harmless COOKING advice!"),
        ];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        // a-c distance 0, b-c distance 1; a-b agree and are skipped
        assert!((analysis.reasoning_divergence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_agreeing_panel_has_no_reasoning_divergence() {
        let outputs = vec![
            out("a", Verdict::Block).with_justification("one"),
            out("b", Verdict::Block).with_justification("two"),
        ];
        assert!(DissentAnalyzer::new().analyze(&outputs).reasoning_divergence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_conflicting_principles() {
        let outputs = vec![
            out("a", Verdict::Allow).with_risk_flags(["privacy", "autonomy"]),
            out("b", Verdict::Block).with_risk_flags(["privacy", "harm", "autonomy"]),
            out("c", Verdict::Review).with_risk_flags(["harm"]),
        ];
        let analysis = DissentAnalyzer::new().analyze(&outputs);
        assert_eq!(analysis.conflicting_principles, vec!["autonomy", "privacy"]);
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("Don't   share PII, e-mail!");
        let expected: BTreeSet<String> = ["don", "t", "share", "pii", "e", "mail"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
    }

    fn analysis_with(index: f64) -> DissentAnalysis {
        let mut analysis = DissentAnalyzer::new().analyze(&[]);
        analysis.dissent_index = index;
        analysis
    }

    #[test]
    fn test_triage_priorities() {
        let analyzer = DissentAnalyzer::new();
        let plain = TriageContext::default();
        let stakes = TriageContext {
            high_stakes: true,
            rights_impacts: vec![],
        };

        assert_eq!(analyzer.triage(analysis_with(0.9), &stakes).priority, ReviewPriority::Critical);
        assert_eq!(analyzer.triage(analysis_with(0.9), &plain).priority, ReviewPriority::High);
        assert_eq!(analyzer.triage(analysis_with(0.1), &stakes).priority, ReviewPriority::High);
        assert_eq!(analyzer.triage(analysis_with(0.5), &plain).priority, ReviewPriority::Medium);
        assert_eq!(analyzer.triage(analysis_with(0.1), &plain).priority, ReviewPriority::Low);
    }

    #[test]
    fn test_critical_rights_impact_forces_critical() {
        let context = TriageContext {
            high_stakes: false,
            rights_impacts: vec![RightsImpact {
                right: "expression".to_string(),
                severity: ImpactSeverity::Critical,
            }],
        };
        let triage = DissentAnalyzer::new().triage(analysis_with(0.0), &context);
        assert_eq!(triage.priority, ReviewPriority::Critical);
        assert_eq!(triage.reasons, vec!["Critical rights impact"]);
    }

    #[test]
    fn test_triage_from_case_context() {
        let case = Case::new("text").with_context("safety_critical", true);
        let outputs = vec![out("a", Verdict::Allow), out("b", Verdict::Block)];
        let analyzer = DissentAnalyzer::new();
        let triage = analyzer.triage(analyzer.analyze(&outputs), &TriageContext::from_case(&case));
        assert_eq!(triage.priority, ReviewPriority::Critical);
        assert!(triage.high_stakes);
    }
}
