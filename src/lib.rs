//! Tribunal - governed decisions over critic panels
//!
//! Tribunal submits a case to a static panel of independent critics, combines
//! their verdicts by confidence and weight, detects structured disagreement,
//! applies prioritized policy rules and routes contested cases to human review
//! with triage metadata. Every evaluation yields a [`DecisionBundle`] that
//! explains how the decision was reached.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): value types and port traits (`Critic`,
//!   `PrecedentLookup`, `AuditSink`)
//! - **Service Layer** (`services`): executor, aggregator, conflict detector,
//!   policy engine, dissent analyzer and the governance pipeline
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   audit sinks and critic adapters
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tribunal::{Case, Config, Critic, GovernanceEngine, ScriptedCritic, Verdict};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let critics: Vec<Arc<dyn Critic>> = vec![
//!         Arc::new(ScriptedCritic::returning("safety", Verdict::Allow, 0.9)),
//!         Arc::new(ScriptedCritic::returning("privacy", Verdict::Allow, 0.8)),
//!     ];
//!     let engine = GovernanceEngine::new(&Config::default(), critics)?;
//!     let bundle = engine.evaluate_case(&Case::new("Publish the report")).await?;
//!     println!("{}", bundle.final_action);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AggregationResult, Case, Config, Conflict, ConflictSeverity, ConflictType, CriticOutput,
    CriticPriority, DecisionBundle, PolicyAction, Precedent, ReviewTriage, RulePriority, Verdict,
};
pub use domain::ports::{AuditSink, Critic, CriticError, CriticEvaluation, PrecedentLookup};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::critics::{CriticRegistry, HttpCritic, ScriptedCritic};
pub use services::{GovernanceEngine, PolicyEngine};
