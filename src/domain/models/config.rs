use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::case::DEFAULT_MAX_CASE_LENGTH;
use super::policy::{PolicyAction, RulePriority};
use super::verdict::{CriticPriority, Verdict};

/// Main configuration structure for Tribunal
///
/// Created once at startup and never reconfigured mid-run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Per-critic weights and priorities
    #[serde(default)]
    pub panel: PanelConfig,

    /// Weighted aggregation thresholds
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Conflict detection thresholds
    #[serde(default)]
    pub conflicts: ConflictConfig,

    /// Critic invocation: parallelism, timeouts, retries
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Decision cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Policy rule set
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Case validation limits
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,
}

/// Static critic registration metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PanelConfig {
    /// Weight per critic name; unlisted critics weigh 1.0
    #[serde(default)]
    pub critic_weights: BTreeMap<String, f64>,

    /// Priority per critic name; unlisted critics have no override
    #[serde(default)]
    pub critic_priorities: BTreeMap<String, CriticPriority>,
}

impl PanelConfig {
    pub fn weight_for(&self, critic: &str) -> f64 {
        self.critic_weights.get(critic).copied().unwrap_or(1.0)
    }

    pub fn priority_for(&self, critic: &str) -> CriticPriority {
        self.critic_priorities
            .get(critic)
            .copied()
            .unwrap_or_default()
    }
}

/// Aggregation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AggregationConfig {
    /// BLOCK score at or above which the verdict is forced to BLOCK
    #[serde(default = "default_block_threshold")]
    pub block_threshold: f64,

    /// Confidence variance above which the verdict is forced to REVIEW
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f64,

    /// Return BLOCK instead of REVIEW when no usable verdict exists
    #[serde(default)]
    pub fail_closed: bool,
}

const fn default_block_threshold() -> f64 {
    1.0
}

const fn default_ambiguity_threshold() -> f64 {
    0.05
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            block_threshold: default_block_threshold(),
            ambiguity_threshold: default_ambiguity_threshold(),
            fail_closed: false,
        }
    }
}

impl AggregationConfig {
    /// Verdict returned when no critic produced a usable verdict.
    pub const fn safe_default(&self) -> Verdict {
        if self.fail_closed {
            Verdict::Block
        } else {
            Verdict::Review
        }
    }
}

/// Conflict detection thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConflictConfig {
    /// Minimum confidence spread (max - min) for a divergence conflict
    #[serde(default = "default_min_confidence_gap")]
    pub min_confidence_gap: f64,

    /// Minimum confidence variance for a divergence conflict
    #[serde(default = "default_confidence_divergence_threshold")]
    pub confidence_divergence_threshold: f64,

    /// Variance above which a divergence conflict is HIGH rather than MEDIUM
    #[serde(default = "default_high_divergence_variance")]
    pub high_divergence_variance: f64,

    /// min/max weighted score ratio at which verdicts count as contested
    #[serde(default = "default_weighted_disagreement_threshold")]
    pub weighted_disagreement_threshold: f64,
}

const fn default_min_confidence_gap() -> f64 {
    0.2
}

const fn default_confidence_divergence_threshold() -> f64 {
    0.1
}

const fn default_high_divergence_variance() -> f64 {
    0.5
}

const fn default_weighted_disagreement_threshold() -> f64 {
    0.7
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            min_confidence_gap: default_min_confidence_gap(),
            confidence_divergence_threshold: default_confidence_divergence_threshold(),
            high_divergence_variance: default_high_divergence_variance(),
            weighted_disagreement_threshold: default_weighted_disagreement_threshold(),
        }
    }
}

/// Critic executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Maximum number of critics invoked concurrently
    #[serde(default = "default_max_parallel_critics")]
    pub max_parallel_critics: usize,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_critic_timeout_ms")]
    pub critic_timeout_ms: u64,

    /// Retry policy for retryable critic failures
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_max_parallel_critics() -> usize {
    4
}

const fn default_critic_timeout_ms() -> u64 {
    30_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel_critics: default_max_parallel_critics(),
            critic_timeout_ms: default_critic_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per critic, including the first
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Backoff before the first retry, in milliseconds
    #[serde(default = "default_retry_backoff_min_ms")]
    pub retry_backoff_min_ms: u64,

    /// Backoff cap, in milliseconds
    #[serde(default = "default_retry_backoff_max_ms")]
    pub retry_backoff_max_ms: u64,

    /// Growth factor between consecutive backoffs
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,
}

const fn default_max_retry_attempts() -> u32 {
    3
}

const fn default_retry_backoff_min_ms() -> u64 {
    1_000
}

const fn default_retry_backoff_max_ms() -> u64 {
    10_000
}

const fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: default_max_retry_attempts(),
            retry_backoff_min_ms: default_retry_backoff_min_ms(),
            retry_backoff_max_ms: default_retry_backoff_max_ms(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
        }
    }
}

/// Decision cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    #[serde(default)]
    pub enable_cache: bool,

    /// Maximum number of cached decision bundles
    #[serde(default = "default_cache_size")]
    pub cache_size: u64,
}

const fn default_cache_size() -> u64 {
    1_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache_size: default_cache_size(),
        }
    }
}

/// Policy rule set configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Skip lower-priority rules once a CRITICAL rule triggers
    #[serde(default = "default_true")]
    pub stop_on_critical: bool,

    /// Prepend the built-in governance rules to `rules`
    #[serde(default = "default_true")]
    pub use_default_rules: bool,

    /// Declarative threshold rules, evaluated in priority order
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

const fn default_true() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            stop_on_critical: true,
            use_default_rules: true,
            rules: vec![],
        }
    }
}

/// Declarative threshold rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleDefinition {
    pub name: String,

    /// Dot-separated path into the metrics document, e.g. `conflicts.critical`
    pub metric: String,

    /// One of `>=`, `>`, `<=`, `<`, `==`, `!=`
    pub operator: String,

    /// Number for ordering operators; any JSON scalar for equality
    pub threshold: Value,

    pub action: PolicyAction,

    #[serde(default = "default_rule_priority")]
    pub priority: RulePriority,

    #[serde(default)]
    pub description: String,
}

const fn default_rule_priority() -> RulePriority {
    RulePriority::Medium
}

/// Case validation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidationConfig {
    #[serde(default = "default_max_case_length")]
    pub max_case_length: usize,
}

const fn default_max_case_length() -> usize {
    DEFAULT_MAX_CASE_LENGTH
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_case_length: default_max_case_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for log files (optional, if None logs only to stderr)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy for file output
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}
