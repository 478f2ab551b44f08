//! Implementation of the `tribunal check-config` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{list_table, output, style_action, CommandOutput};
use crate::domain::models::{Config, PolicyAction, RulePriority};
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::critics::CriticRegistry;
use crate::services::PolicyEngine;

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// Also validate a panel file and fold its weights into the check
    #[arg(long)]
    pub panel: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct RuleSummary {
    pub name: String,
    pub priority: RulePriority,
    pub action: PolicyAction,
}

#[derive(Debug, Serialize)]
pub struct CheckConfigOutput {
    pub valid: bool,
    pub stop_on_critical: bool,
    pub rules: Vec<RuleSummary>,
    pub critics: Vec<String>,
    pub max_parallel_critics: usize,
    pub critic_timeout_ms: u64,
    pub max_retry_attempts: u32,
    pub cache_enabled: bool,
}

impl CommandOutput for CheckConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            "Configuration is valid".to_string(),
            format!(
                "Executor: {} parallel, {}ms timeout, {} attempts",
                self.max_parallel_critics, self.critic_timeout_ms, self.max_retry_attempts
            ),
            format!("Cache: {}", if self.cache_enabled { "enabled" } else { "disabled" }),
        ];

        if !self.critics.is_empty() {
            lines.push(format!("Panel: {}", self.critics.join(", ")));
        }

        let mut table = list_table(&["rule", "priority", "action"]);
        for rule in &self.rules {
            table.add_row(vec![
                rule.name.clone(),
                rule.priority.to_string(),
                style_action(rule.action).to_string(),
            ]);
        }
        lines.push(String::new());
        lines.push(format!(
            "{} rule(s), stop on critical: {}",
            self.rules.len(),
            self.stop_on_critical
        ));
        lines.push(table.to_string());
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Validate and summarize the effective configuration.
pub fn check(args: &CheckConfigArgs, mut config: Config) -> Result<CheckConfigOutput> {
    let mut critics = Vec::new();
    if let Some(panel) = &args.panel {
        let registry = CriticRegistry::load(panel)?;
        registry.apply_to(&mut config.panel);
        critics = registry.names().into_iter().map(str::to_string).collect();
    }

    ConfigLoader::validate(&config)?;
    let engine = PolicyEngine::from_config(&config.policy, &config.aggregation)
        .context("Invalid policy rules")?;

    Ok(CheckConfigOutput {
        valid: true,
        stop_on_critical: config.policy.stop_on_critical,
        rules: engine
            .rules()
            .map(|rule| RuleSummary {
                name: rule.name().to_string(),
                priority: rule.priority(),
                action: rule.action(),
            })
            .collect(),
        critics,
        max_parallel_critics: config.executor.max_parallel_critics,
        critic_timeout_ms: config.executor.critic_timeout_ms,
        max_retry_attempts: config.executor.retry.max_retry_attempts,
        cache_enabled: config.cache.enable_cache,
    })
}

pub async fn execute(args: CheckConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    let result = check(&args, config)?;
    output(&result, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RuleDefinition;
    use tempfile::TempDir;

    #[test]
    fn test_default_rules_listed() {
        let result = check(&CheckConfigArgs { panel: None }, Config::default()).unwrap();
        let names: Vec<&str> = result.rules.iter().map(|r| r.name.as_str()).collect();

        assert!(result.valid);
        assert!(names.contains(&"blocking_verdict"));
        assert!(names.contains(&"ambiguity_warning"));
        assert_eq!(result.rules.len(), 7);
    }

    #[test]
    fn test_custom_rule_appended() {
        let mut config = Config::default();
        config.policy.rules.push(RuleDefinition {
            name: "too_many_errors".to_string(),
            metric: "critics.error_count".to_string(),
            operator: ">=".to_string(),
            threshold: serde_json::json!(2),
            action: PolicyAction::Escalate,
            priority: RulePriority::High,
            description: String::new(),
        });

        let result = check(&CheckConfigArgs { panel: None }, config).unwrap();
        assert!(result.rules.iter().any(|r| r.name == "too_many_errors"));
    }

    #[test]
    fn test_invalid_operator_rejected() {
        let mut config = Config::default();
        config.policy.rules.push(RuleDefinition {
            name: "bad".to_string(),
            metric: "avg_confidence".to_string(),
            operator: "~=".to_string(),
            threshold: serde_json::json!(0.5),
            action: PolicyAction::Warn,
            priority: RulePriority::Low,
            description: String::new(),
        });

        assert!(check(&CheckConfigArgs { panel: None }, config).is_err());
    }

    #[test]
    fn test_panel_names_reported() {
        let dir = TempDir::new().unwrap();
        let panel = dir.path().join("panel.yaml");
        std::fs::write(
            &panel,
            "critics:\n  - { name: solo, kind: scripted, weight: 3.0, steps: [ { evaluation: { verdict: ALLOW, confidence: 1.0 } } ] }\n",
        )
        .unwrap();

        let result = check(&CheckConfigArgs { panel: Some(panel) }, Config::default()).unwrap();
        assert_eq!(result.critics, vec!["solo"]);
    }
}
