pub mod aggregator;
pub mod conflict_detector;
pub mod critic_executor;
pub mod decision_cache;
pub mod dissent_analyzer;
pub mod governance;
pub mod metrics;
pub mod policy_engine;
pub mod retry;

pub use aggregator::Aggregator;
pub use conflict_detector::ConflictDetector;
pub use critic_executor::CriticExecutor;
pub use decision_cache::DecisionCache;
pub use dissent_analyzer::DissentAnalyzer;
pub use governance::GovernanceEngine;
pub use metrics::build_metrics;
pub use policy_engine::{ComparisonOperator, CustomRule, PolicyEngine, PolicyRule, ThresholdRule};
pub use retry::{RetryOutcome, RetryPolicy};
