use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::errors::PolicyConfigError;
use crate::domain::models::config::Config;
use crate::services::policy_engine::PolicyEngine;

/// Project configuration file, created by the operator.
pub const PROJECT_CONFIG: &str = ".tribunal/config.yaml";

/// Optional local overrides, not meant to be committed.
pub const LOCAL_CONFIG: &str = ".tribunal/local.yaml";

/// Environment variable prefix; `__` separates nested keys.
pub const ENV_PREFIX: &str = "TRIBUNAL_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid max_parallel_critics: {0}. Must be at least 1")]
    InvalidMaxParallelCritics(usize),

    #[error("Invalid critic_timeout_ms: {0}. Must be positive")]
    InvalidCriticTimeout(u64),

    #[error("Invalid max_retry_attempts: {0}. Cannot be 0")]
    InvalidMaxRetryAttempts(u32),

    #[error(
        "Invalid backoff configuration: retry_backoff_min_ms ({0}) must not exceed retry_backoff_max_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid retry_backoff_multiplier: {0}. Must be a finite number >= 1")]
    InvalidBackoffMultiplier(f64),

    #[error("Invalid weight for critic '{0}': {1}. Must be a finite number >= 0")]
    InvalidCriticWeight(String, f64),

    #[error("Invalid {0}: {1}. Must be a finite number >= 0")]
    InvalidThreshold(&'static str, f64),

    #[error("Invalid {0}: {1}. Must be between 0 and 1")]
    InvalidRatio(&'static str, f64),

    #[error("Invalid cache_size: {0}. Must be at least 1 when caching is enabled")]
    InvalidCacheSize(u64),

    #[error("Invalid max_case_length: {0}. Must be at least 1")]
    InvalidMaxCaseLength(usize),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyConfigError),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .tribunal/config.yaml (project config)
    /// 3. .tribunal/local.yaml (local overrides, optional)
    /// 4. Environment variables (TRIBUNAL_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(&[Path::new(PROJECT_CONFIG), Path::new(LOCAL_CONFIG)])
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::figment(&[path])
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(files: &[&Path]) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        files
            .iter()
            .fold(figment, |figment, file| figment.merge(Yaml::file(file)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        // Executor
        let executor = &config.executor;
        if executor.max_parallel_critics == 0 {
            return Err(ConfigError::InvalidMaxParallelCritics(0));
        }
        if executor.critic_timeout_ms == 0 {
            return Err(ConfigError::InvalidCriticTimeout(0));
        }

        let retry = &executor.retry;
        if retry.max_retry_attempts == 0 {
            return Err(ConfigError::InvalidMaxRetryAttempts(0));
        }
        if retry.retry_backoff_min_ms > retry.retry_backoff_max_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.retry_backoff_min_ms,
                retry.retry_backoff_max_ms,
            ));
        }
        if !retry.retry_backoff_multiplier.is_finite() || retry.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidBackoffMultiplier(
                retry.retry_backoff_multiplier,
            ));
        }

        // Panel
        for (critic, weight) in &config.panel.critic_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigError::InvalidCriticWeight(critic.clone(), *weight));
            }
        }

        // Thresholds
        non_negative("block_threshold", config.aggregation.block_threshold)?;
        non_negative("ambiguity_threshold", config.aggregation.ambiguity_threshold)?;

        let conflicts = &config.conflicts;
        ratio("min_confidence_gap", conflicts.min_confidence_gap)?;
        ratio(
            "confidence_divergence_threshold",
            conflicts.confidence_divergence_threshold,
        )?;
        non_negative("high_divergence_variance", conflicts.high_divergence_variance)?;
        ratio(
            "weighted_disagreement_threshold",
            conflicts.weighted_disagreement_threshold,
        )?;

        if config.cache.enable_cache && config.cache.cache_size == 0 {
            return Err(ConfigError::InvalidCacheSize(0));
        }

        if config.validation.max_case_length == 0 {
            return Err(ConfigError::InvalidMaxCaseLength(0));
        }

        // Rule definitions are checked by building the engine once
        PolicyEngine::from_config(&config.policy, &config.aggregation)?;

        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold(name, value))
    }
}

fn ratio(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRatio(name, value))
    }
}
