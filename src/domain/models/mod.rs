pub mod aggregation;
pub mod case;
pub mod config;
pub mod conflict;
pub mod critic_output;
pub mod decision;
pub mod dissent;
pub mod policy;
pub mod verdict;

pub use aggregation::AggregationResult;
pub use case::Case;
pub use config::{
    AggregationConfig, CacheConfig, Config, ConflictConfig, ExecutorConfig, LogConfig, LogFormat,
    PanelConfig, PolicyConfig, RetryConfig, RotationPolicy, RuleDefinition, ValidationConfig,
};
pub use conflict::{Conflict, ConflictSeverity, ConflictSummary, ConflictType, CriticPosition};
pub use critic_output::CriticOutput;
pub use decision::{DecisionBundle, Precedent};
pub use dissent::{
    DisagreementType, DissentAnalysis, ImpactSeverity, ReviewPriority, ReviewTriage, RightsImpact,
    TriageContext,
};
pub use policy::{PolicyAction, PolicyEvaluation, PolicyRuleResult, RulePriority};
pub use verdict::{CriticPriority, Verdict};
