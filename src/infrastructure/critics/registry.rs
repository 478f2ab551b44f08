//! Static critic registration from a panel file.
//!
//! ```yaml
//! critics:
//!   - name: safety
//!     kind: http
//!     endpoint: https://critics.internal/safety
//!     api_key_env: SAFETY_CRITIC_KEY
//!     weight: 2.0
//!     priority: override
//!   - name: style
//!     kind: scripted
//!     steps:
//!       - evaluation: { verdict: ALLOW, confidence: 0.9, justification: plain prose }
//! ```
//!
//! Weights and priorities declared here take precedence over the
//! `panel` section of the configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::http::{HttpCritic, DEFAULT_HTTP_TIMEOUT_MS};
use super::scripted::{ScriptedCritic, ScriptedStep};
use crate::domain::models::{CriticPriority, PanelConfig};
use crate::domain::ports::Critic;

/// Panel construction errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Critic name cannot be empty")]
    EmptyName,

    #[error("Duplicate critic name: {0}")]
    DuplicateCritic(String),

    #[error("Critic '{0}' has an empty script")]
    EmptyScript(String),

    #[error("Critic '{critic}' needs environment variable {var}")]
    MissingApiKey { critic: String, var: String },

    #[error("Invalid weight for critic '{0}': {1}")]
    InvalidWeight(String, f64),

    #[error("Failed to build HTTP critic '{critic}': {message}")]
    HttpClient { critic: String, message: String },

    #[error("Invalid panel file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// How a critic is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CriticKind {
    Http {
        endpoint: String,
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Scripted {
        steps: Vec<ScriptedStep>,
    },
}

/// One panel entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticSpec {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub priority: Option<CriticPriority>,
    #[serde(flatten)]
    pub kind: CriticKind,
}

#[derive(Debug, Deserialize)]
struct PanelFile {
    critics: Vec<CriticSpec>,
}

/// The static critic panel, in registration order.
pub struct CriticRegistry {
    critics: Vec<Arc<dyn Critic>>,
    specs: Vec<CriticSpec>,
}

impl CriticRegistry {
    /// Build the panel. Names must be unique.
    pub fn from_specs(specs: &[CriticSpec]) -> Result<Self, RegistryError> {
        let mut seen = BTreeSet::new();
        let mut critics: Vec<Arc<dyn Critic>> = Vec::with_capacity(specs.len());

        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateCritic(spec.name.clone()));
            }
            if let Some(weight) = spec.weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(RegistryError::InvalidWeight(spec.name.clone(), weight));
                }
            }
            critics.push(build_critic(spec)?);
        }

        Ok(Self {
            critics,
            specs: specs.to_vec(),
        })
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RegistryError> {
        let file: PanelFile = serde_yaml::from_str(yaml)?;
        Self::from_specs(&file.critics)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read panel file {}", path.display()))?;
        Self::from_yaml(&yaml).with_context(|| format!("Failed to load panel from {}", path.display()))
    }

    pub fn critics(&self) -> &[Arc<dyn Critic>] {
        &self.critics
    }

    pub fn into_critics(self) -> Vec<Arc<dyn Critic>> {
        self.critics
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.critics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.critics.is_empty()
    }

    /// Overlay weights and priorities declared in the panel file.
    pub fn apply_to(&self, panel: &mut PanelConfig) {
        for spec in &self.specs {
            if let Some(weight) = spec.weight {
                panel.critic_weights.insert(spec.name.clone(), weight);
            }
            if let Some(priority) = spec.priority {
                panel.critic_priorities.insert(spec.name.clone(), priority);
            }
        }
    }
}

fn build_critic(spec: &CriticSpec) -> Result<Arc<dyn Critic>, RegistryError> {
    match &spec.kind {
        CriticKind::Http {
            endpoint,
            api_key_env,
            timeout_ms,
        } => {
            let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS));
            let mut critic = HttpCritic::new(&spec.name, endpoint, timeout).map_err(|e| {
                RegistryError::HttpClient {
                    critic: spec.name.clone(),
                    message: e.to_string(),
                }
            })?;

            if let Some(var) = api_key_env {
                let key = std::env::var(var).map_err(|_| RegistryError::MissingApiKey {
                    critic: spec.name.clone(),
                    var: var.clone(),
                })?;
                critic = critic.with_api_key(key);
            }

            Ok(Arc::new(critic))
        }
        CriticKind::Scripted { steps } => {
            if steps.is_empty() {
                return Err(RegistryError::EmptyScript(spec.name.clone()));
            }
            Ok(Arc::new(ScriptedCritic::new(&spec.name, steps.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Case, Verdict};

    const PANEL: &str = r"
critics:
  - name: safety
    kind: scripted
    weight: 2.0
    priority: override
    steps:
      - evaluation: { verdict: BLOCK, confidence: 0.7, justification: unsafe }
  - name: style
    kind: scripted
    steps:
      - evaluation: { verdict: ALLOW, confidence: 0.9 }
  - name: remote
    kind: http
    endpoint: http://127.0.0.1:9/evaluate
    timeout_ms: 500
";

    #[tokio::test]
    async fn test_from_yaml_preserves_order() {
        let registry = CriticRegistry::from_yaml(PANEL).unwrap();
        assert_eq!(registry.names(), vec!["safety", "style", "remote"]);
        assert_eq!(registry.len(), 3);

        let evaluation = registry.critics()[0].evaluate(&Case::new("x")).await.unwrap();
        assert_eq!(evaluation.verdict, Verdict::Block);
    }

    #[test]
    fn test_apply_to_panel_config() {
        let registry = CriticRegistry::from_yaml(PANEL).unwrap();
        let mut panel = PanelConfig::default();
        panel.critic_weights.insert("style".to_string(), 0.5);
        registry.apply_to(&mut panel);

        assert!((panel.weight_for("safety") - 2.0).abs() < f64::EPSILON);
        assert!((panel.weight_for("style") - 0.5).abs() < f64::EPSILON);
        assert_eq!(panel.priority_for("safety"), CriticPriority::Override);
        assert_eq!(panel.priority_for("remote"), CriticPriority::None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = r"
critics:
  - { name: a, kind: scripted, steps: [ { evaluation: { verdict: ALLOW, confidence: 1.0 } } ] }
  - { name: a, kind: scripted, steps: [ { evaluation: { verdict: BLOCK, confidence: 1.0 } } ] }
";
        assert!(matches!(
            CriticRegistry::from_yaml(yaml),
            Err(RegistryError::DuplicateCritic(name)) if name == "a"
        ));
    }

    #[test]
    fn test_empty_script_rejected() {
        let yaml = "critics:\n  - { name: a, kind: scripted, steps: [] }\n";
        assert!(matches!(
            CriticRegistry::from_yaml(yaml),
            Err(RegistryError::EmptyScript(_))
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let yaml = "critics:\n  - { name: a, kind: scripted, weight: -1.0, steps: [ { evaluation: { verdict: ALLOW, confidence: 1.0 } } ] }\n";
        assert!(matches!(
            CriticRegistry::from_yaml(yaml),
            Err(RegistryError::InvalidWeight(_, _))
        ));
    }

    #[test]
    fn test_missing_api_key_env() {
        let yaml = "critics:\n  - { name: a, kind: http, endpoint: 'http://localhost/x', api_key_env: TRIBUNAL_TEST_UNSET_KEY }\n";
        temp_env::with_var_unset("TRIBUNAL_TEST_UNSET_KEY", || {
            assert!(matches!(
                CriticRegistry::from_yaml(yaml),
                Err(RegistryError::MissingApiKey { .. })
            ));
        });
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let yaml = "critics:\n  - { name: a, kind: carrier_pigeon }\n";
        assert!(matches!(CriticRegistry::from_yaml(yaml), Err(RegistryError::Parse(_))));
    }
}
