//! Implementation of the `tribunal evaluate` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::cli::output::{list_table, output, style_action, style_verdict, truncate, CommandOutput};
use crate::domain::models::{Case, Config, DecisionBundle};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::critics::CriticRegistry;
use crate::infrastructure::logging::JsonlAuditSink;
use crate::services::GovernanceEngine;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Case file (YAML or JSON) with `text` and optional `context`
    #[arg(long)]
    pub case: PathBuf,

    /// Panel file declaring the critics
    #[arg(long)]
    pub panel: PathBuf,

    /// Append the decision bundle to this JSONL audit log
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct EvaluateOutput {
    #[serde(flatten)]
    pub bundle: DecisionBundle,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        let bundle = &self.bundle;
        let aggregation = &bundle.aggregation_result;

        let mut lines = vec![
            format!(
                "Decision: {} (verdict {}){}",
                style_action(bundle.final_action),
                style_verdict(aggregation.overall_verdict),
                if bundle.from_cache { " [cached]" } else { "" }
            ),
            format!("Reason: {}", aggregation.reason),
            format!(
                "Average confidence {:.2}, ambiguity {:.3}",
                aggregation.avg_confidence, aggregation.ambiguity
            ),
        ];

        let mut critics = list_table(&["critic", "verdict", "confidence", "weight", "attempts", "justification"]);
        for critic in &bundle.critic_outputs {
            critics.add_row(vec![
                critic.critic_name.clone(),
                style_verdict(critic.verdict).to_string(),
                format!("{:.2}", critic.confidence),
                format!("{:.2}", critic.weight),
                critic.attempts.to_string(),
                truncate(&critic.justification, 60),
            ]);
        }
        lines.push(String::new());
        lines.push(critics.to_string());

        if !bundle.conflicts.is_empty() {
            let mut conflicts = list_table(&["conflict", "severity", "critics"]);
            for conflict in &bundle.conflicts {
                conflicts.add_row(vec![
                    conflict.conflict_type.to_string(),
                    conflict.severity.to_string(),
                    conflict.involved_critics.join(", "),
                ]);
            }
            lines.push(String::new());
            lines.push(conflicts.to_string());
        }

        let triggered = &bundle.policy_result.triggered_rules;
        if !triggered.is_empty() {
            lines.push(String::new());
            lines.push(format!("Triggered rules: {}", triggered.join(", ")));
        }

        if let Some(triage) = &bundle.triage {
            lines.push(format!(
                "Review priority: {:?} (dissent {:.2})",
                triage.priority, triage.dissent.dissent_index
            ));
            for reason in &triage.reasons {
                lines.push(format!("  - {reason}"));
            }
        }

        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Parse a case file. JSON parses as YAML.
pub fn read_case(path: &Path) -> Result<Case> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read case file {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("Invalid case file {}", path.display()))
}

pub async fn execute(args: EvaluateArgs, mut config: Config, json_mode: bool) -> Result<()> {
    let registry = CriticRegistry::load(&args.panel)?;
    registry.apply_to(&mut config.panel);
    ConfigLoader::validate(&config).context("Invalid panel weights")?;

    let case = read_case(&args.case)?;
    info!(critics = registry.len(), case_id = %case.id, "Replaying panel");

    let mut engine = GovernanceEngine::new(&config, registry.into_critics())?;
    if let Some(path) = &args.audit_log {
        let sink = JsonlAuditSink::new(path)
            .await
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        engine = engine.with_audit_sink(Arc::new(sink));
    }

    let bundle = engine.evaluate_case(&case).await.context("Evaluation failed")?;
    output(&EvaluateOutput { bundle }, json_mode);
    Ok(())
}
