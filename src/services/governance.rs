//! Governance pipeline.
//!
//! One call to [`GovernanceEngine::evaluate_case`] runs the whole flow:
//!
//! 1. Validate the case (the only step whose failure reaches the caller)
//! 2. Serve a cached decision for an identical case, if caching is enabled
//! 3. Invoke the critic panel while precedents are looked up
//! 4. Aggregate, detect conflicts, evaluate policy, analyse dissent
//! 5. Assemble the decision bundle, cache it and hand it to the audit sink
//!
//! Every stage after validation is a pure function of the critic outputs plus
//! static configuration.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Case, Config, DecisionBundle, PolicyAction, Precedent, TriageContext,
};
use crate::domain::ports::{AuditSink, Critic, NullPrecedentLookup, PrecedentLookup};
use crate::services::aggregator::Aggregator;
use crate::services::conflict_detector::ConflictDetector;
use crate::services::critic_executor::CriticExecutor;
use crate::services::decision_cache::DecisionCache;
use crate::services::dissent_analyzer::DissentAnalyzer;
use crate::services::metrics::build_metrics;
use crate::services::policy_engine::PolicyEngine;

/// Renders governed decisions over a static critic panel.
pub struct GovernanceEngine {
    critics: Vec<Arc<dyn Critic>>,
    executor: CriticExecutor,
    aggregator: Aggregator,
    conflict_detector: ConflictDetector,
    policy_engine: PolicyEngine,
    dissent_analyzer: DissentAnalyzer,
    precedents: Arc<dyn PrecedentLookup>,
    audit_sink: Option<Arc<dyn AuditSink>>,
    cache: Option<DecisionCache>,
    max_case_length: usize,
}

impl GovernanceEngine {
    /// Build the pipeline from configuration.
    ///
    /// Fails only when the policy rule set is invalid.
    pub fn new(config: &Config, critics: Vec<Arc<dyn Critic>>) -> DomainResult<Self> {
        Ok(Self {
            critics,
            executor: CriticExecutor::new(config.executor.clone(), config.panel.clone()),
            aggregator: Aggregator::new(config.aggregation.clone()),
            conflict_detector: ConflictDetector::new(config.conflicts.clone()),
            policy_engine: PolicyEngine::from_config(&config.policy, &config.aggregation)?,
            dissent_analyzer: DissentAnalyzer::new(),
            precedents: Arc::new(NullPrecedentLookup::new()),
            audit_sink: None,
            cache: DecisionCache::from_config(&config.cache),
            max_case_length: config.validation.max_case_length,
        })
    }

    #[must_use]
    pub fn with_precedent_lookup(mut self, precedents: Arc<dyn PrecedentLookup>) -> Self {
        self.precedents = precedents;
        self
    }

    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: DecisionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the configured rule set.
    #[must_use]
    pub fn with_policy_engine(mut self, policy_engine: PolicyEngine) -> Self {
        self.policy_engine = policy_engine;
        self
    }

    pub fn critic_names(&self) -> Vec<&str> {
        self.critics.iter().map(|c| c.name()).collect()
    }

    pub const fn policy_engine(&self) -> &PolicyEngine {
        &self.policy_engine
    }

    pub const fn cache(&self) -> Option<&DecisionCache> {
        self.cache.as_ref()
    }

    /// Evaluate one case end to end.
    #[instrument(skip(self, case), fields(case_id = %case.id, critics = self.critics.len()))]
    pub async fn evaluate_case(&self, case: &Case) -> DomainResult<DecisionBundle> {
        case.validate(self.max_case_length)?;

        if let Some(cache) = &self.cache {
            if let Some(bundle) = cache.get(case).await {
                info!(
                    request_id = %bundle.request_id,
                    final_action = %bundle.final_action,
                    "Serving cached decision"
                );
                self.audit(&bundle).await;
                return Ok(bundle);
            }
        }

        let (critic_outputs, precedents) = tokio::join!(
            self.executor.execute(case, &self.critics),
            self.lookup_precedents(case)
        );

        let aggregation_result = self.aggregator.aggregate(&critic_outputs);
        let conflicts = self.conflict_detector.detect(&critic_outputs);
        let conflict_summary = ConflictDetector::summarize(&conflicts);

        let metrics = build_metrics(
            &aggregation_result,
            &conflict_summary,
            &critic_outputs,
            &precedents,
        );
        let policy_result = self.policy_engine.evaluate_all(&metrics);

        let final_action = policy_result
            .recommended_action
            .most_restrictive(PolicyAction::floor_for(aggregation_result.overall_verdict));

        let triage = final_action.needs_review().then(|| {
            let dissent = self.dissent_analyzer.analyze(&critic_outputs);
            self.dissent_analyzer
                .triage(dissent, &TriageContext::from_case(case))
        });

        let bundle = DecisionBundle {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            case_id: case.id,
            case_fingerprint: case.fingerprint(),
            critic_outputs,
            aggregation_result,
            conflicts,
            conflict_summary,
            policy_result,
            final_action,
            triage,
            precedents,
            from_cache: false,
        };

        info!(
            request_id = %bundle.request_id,
            verdict = %bundle.overall_verdict(),
            final_action = %bundle.final_action,
            conflicts = bundle.conflict_summary.total,
            errors = bundle.error_count(),
            "Case evaluated"
        );

        if let Some(cache) = &self.cache {
            cache.insert(&bundle).await;
        }
        self.audit(&bundle).await;

        Ok(bundle)
    }

    async fn lookup_precedents(&self, case: &Case) -> Vec<Precedent> {
        match self.precedents.lookup(case).await {
            Ok(precedents) => precedents,
            Err(err) => {
                warn!(error = %err, "Precedent lookup failed, continuing without precedents");
                Vec::new()
            }
        }
    }

    async fn audit(&self, bundle: &DecisionBundle) {
        if let Some(sink) = &self.audit_sink {
            if let Err(err) = sink.log_decision(bundle).await {
                warn!(request_id = %bundle.request_id, error = %err, "Audit sink failed");
            }
        }
    }
}

impl std::fmt::Debug for GovernanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceEngine")
            .field("critics", &self.critic_names())
            .field("policy_engine", &self.policy_engine)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::{CriticPriority, ReviewPriority, Verdict};
    use crate::domain::ports::{CriticError, CriticEvaluation, PrecedentError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedCritic {
        name: String,
        verdict: Verdict,
        confidence: f64,
        calls: Arc<AtomicUsize>,
    }

    impl FixedCritic {
        fn arc(name: &str, verdict: Verdict, confidence: f64) -> Arc<dyn Critic> {
            Arc::new(Self {
                name: name.to_string(),
                verdict,
                confidence,
                calls: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[async_trait]
    impl Critic for FixedCritic {
        fn name(&self) -> &str {
            &self.name
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CriticEvaluation::new(self.verdict, self.confidence, "fixed"))
        }
    }

    struct BrokenCritic(&'static str);

    #[async_trait]
    impl Critic for BrokenCritic {
        fn name(&self) -> &str {
            self.0
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            Err(CriticError::Rejected("bad request".into()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        bundles: Mutex<Vec<DecisionBundle>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn log_decision(&self, bundle: &DecisionBundle) -> anyhow::Result<()> {
            self.bundles.lock().unwrap().push(bundle.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn log_decision(&self, _bundle: &DecisionBundle) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    struct FailingPrecedents;

    #[async_trait]
    impl PrecedentLookup for FailingPrecedents {
        async fn lookup(&self, _case: &Case) -> Result<Vec<Precedent>, PrecedentError> {
            Err(PrecedentError::Unavailable("offline".into()))
        }
    }

    fn engine(critics: Vec<Arc<dyn Critic>>) -> GovernanceEngine {
        GovernanceEngine::new(&Config::default(), critics).unwrap()
    }

    #[tokio::test]
    async fn test_agreeing_panel_allows() {
        let engine = engine(vec![
            FixedCritic::arc("a", Verdict::Allow, 0.9),
            FixedCritic::arc("b", Verdict::Allow, 0.9),
            FixedCritic::arc("c", Verdict::Allow, 0.9),
        ]);

        let bundle = engine.evaluate_case(&Case::new("how do I bake bread")).await.unwrap();

        assert_eq!(bundle.overall_verdict(), Verdict::Allow);
        assert_eq!(bundle.final_action, PolicyAction::Allow);
        assert!(bundle.conflicts.is_empty());
        assert!(bundle.triage.is_none());
        assert!(!bundle.from_cache);
    }

    #[tokio::test]
    async fn test_invalid_case_is_rejected_before_critics_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let critic: Arc<dyn Critic> = Arc::new(FixedCritic {
            name: "a".into(),
            verdict: Verdict::Allow,
            confidence: 0.9,
            calls: Arc::clone(&calls),
        });
        let engine = engine(vec![critic]);

        let err = engine.evaluate_case(&Case::new("   ")).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_critics_failing_yields_safe_default() {
        let engine = engine(vec![Arc::new(BrokenCritic("a")), Arc::new(BrokenCritic("b"))]);

        let bundle = engine.evaluate_case(&Case::new("text")).await.unwrap();

        assert_eq!(bundle.overall_verdict(), Verdict::Review);
        assert!(bundle.aggregation_result.degenerate);
        assert!(bundle.aggregation_result.avg_confidence.abs() < f64::EPSILON);
        assert_eq!(bundle.final_action, PolicyAction::Review);
        assert_eq!(bundle.error_count(), 2);
        assert!(bundle.triage.is_some());
    }

    #[tokio::test]
    async fn test_override_block_denies() {
        let mut config = Config::default();
        config
            .panel
            .critic_priorities
            .insert("safety".to_string(), CriticPriority::Override);
        let engine = GovernanceEngine::new(
            &config,
            vec![
                FixedCritic::arc("style", Verdict::Allow, 0.95),
                FixedCritic::arc("tone", Verdict::Allow, 0.95),
                FixedCritic::arc("safety", Verdict::Block, 0.6),
            ],
        )
        .unwrap();

        let bundle = engine.evaluate_case(&Case::new("text")).await.unwrap();

        assert_eq!(bundle.overall_verdict(), Verdict::Block);
        assert!(bundle.aggregation_result.override_applied);
        assert!(bundle.aggregation_result.reason.contains("Override"));
        assert_eq!(bundle.final_action, PolicyAction::Deny);
    }

    #[tokio::test]
    async fn test_disagreement_on_high_stakes_case_is_triaged() {
        let engine = engine(vec![
            FixedCritic::arc("a", Verdict::Allow, 0.9),
            FixedCritic::arc("b", Verdict::Review, 0.9),
        ]);
        let case = Case::new("text").with_context("legal_risk", true);

        let bundle = engine.evaluate_case(&case).await.unwrap();

        assert_eq!(bundle.overall_verdict(), Verdict::Review);
        let triage = bundle.triage.expect("review decisions carry triage");
        assert!(triage.high_stakes);
        assert_eq!(triage.priority, ReviewPriority::Critical);
    }

    #[tokio::test]
    async fn test_cache_reissues_identical_case() {
        let calls = Arc::new(AtomicUsize::new(0));
        let critic: Arc<dyn Critic> = Arc::new(FixedCritic {
            name: "a".into(),
            verdict: Verdict::Allow,
            confidence: 0.9,
            calls: Arc::clone(&calls),
        });
        let engine = engine(vec![critic]).with_cache(DecisionCache::new(16));

        let first = engine.evaluate_case(&Case::new("same text")).await.unwrap();
        let second_case = Case::new("same text");
        let second = engine.evaluate_case(&second_case).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.case_id, second_case.id);
        assert_ne!(second.request_id, first.request_id);
        assert_eq!(second.case_fingerprint, first.case_fingerprint);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_skips_bundles_with_errors() {
        let engine = engine(vec![
            FixedCritic::arc("a", Verdict::Allow, 0.9),
            Arc::new(BrokenCritic("b")),
        ])
        .with_cache(DecisionCache::new(16));

        engine.evaluate_case(&Case::new("text")).await.unwrap();
        let second = engine.evaluate_case(&Case::new("text")).await.unwrap();
        assert!(!second.from_cache);
    }

    #[tokio::test]
    async fn test_audit_sink_receives_every_decision() {
        let sink = Arc::new(RecordingSink::default());
        let engine = engine(vec![FixedCritic::arc("a", Verdict::Allow, 0.9)])
            .with_audit_sink(Arc::clone(&sink) as Arc<dyn AuditSink>);

        let bundle = engine.evaluate_case(&Case::new("text")).await.unwrap();

        let recorded = sink.bundles.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].request_id, bundle.request_id);
    }

    #[tokio::test]
    async fn test_collaborator_failures_do_not_surface() {
        let engine = engine(vec![FixedCritic::arc("a", Verdict::Allow, 0.9)])
            .with_audit_sink(Arc::new(FailingSink))
            .with_precedent_lookup(Arc::new(FailingPrecedents));

        let bundle = engine.evaluate_case(&Case::new("text")).await.unwrap();
        assert!(bundle.precedents.is_empty());
        assert_eq!(bundle.final_action, PolicyAction::Allow);
    }

    #[tokio::test]
    async fn test_invalid_policy_rejected_at_construction() {
        let mut config = Config::default();
        config.policy.rules.push(crate::domain::models::RuleDefinition {
            name: "bad".into(),
            metric: "ambiguity".into(),
            operator: "~=".into(),
            threshold: serde_json::json!(1),
            action: PolicyAction::Warn,
            priority: crate::domain::models::RulePriority::Low,
            description: String::new(),
        });

        let err = GovernanceEngine::new(&config, vec![]).unwrap_err();
        assert!(matches!(err, DomainError::PolicyConfiguration(_)));
    }
}
