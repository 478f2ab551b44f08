//! Critic executor.
//!
//! Fans a case out to every registered critic under a bounded worker pool.
//! Each invocation runs through the retry policy with a per-attempt timeout;
//! whatever happens to one critic is contained to that critic's output slot.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::models::{Case, CriticOutput, CriticPriority, ExecutorConfig, PanelConfig, Verdict};
use crate::domain::ports::{Critic, CriticError};
use crate::services::retry::RetryPolicy;

/// Registration metadata stamped onto each critic's output.
#[derive(Debug, Clone, Copy)]
struct CriticProfile {
    weight: f64,
    priority: CriticPriority,
}

/// Invokes a static panel of critics for one case at a time.
///
/// The semaphore is shared by every case evaluated through this executor, so
/// `max_parallel_critics` bounds critic calls process-wide.
pub struct CriticExecutor {
    config: ExecutorConfig,
    panel: PanelConfig,
    retry_policy: RetryPolicy,
    /// Semaphore to limit concurrent critic invocations.
    concurrency_limiter: Arc<Semaphore>,
}

impl CriticExecutor {
    pub fn new(config: ExecutorConfig, panel: PanelConfig) -> Self {
        let retry_policy = RetryPolicy::from_config(&config.retry);
        let permits = config.max_parallel_critics.max(1);
        Self {
            config,
            panel,
            retry_policy,
            concurrency_limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ExecutorConfig::default(), PanelConfig::default())
    }

    fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.config.critic_timeout_ms.max(1))
    }

    fn profile_for(&self, critic: &str) -> CriticProfile {
        CriticProfile {
            weight: self.panel.weight_for(critic),
            priority: self.panel.priority_for(critic),
        }
    }

    /// Run every critic against the case.
    ///
    /// Returns exactly one output per critic, in registration order, whatever
    /// order the critics complete in.
    pub async fn execute(&self, case: &Case, critics: &[Arc<dyn Critic>]) -> Vec<CriticOutput> {
        let started = Instant::now();

        let outputs = match critics {
            [] => Vec::new(),
            [critic] => vec![self.execute_direct(case, critic.as_ref()).await],
            _ => self.execute_parallel(case, critics).await,
        };

        let errors = outputs.iter().filter(|o| o.is_error()).count();
        info!(
            case_id = %case.id,
            critics = critics.len(),
            errors,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Critic panel finished"
        );

        outputs
    }

    /// Single-critic path: no task spawn, no pool.
    async fn execute_direct(&self, case: &Case, critic: &dyn Critic) -> CriticOutput {
        let profile = self.profile_for(critic.name());
        let invocation = invoke_critic(critic, case, &self.retry_policy, self.attempt_timeout(), profile);

        match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(output) => output,
            Err(_) => {
                error!(critic = critic.name(), "Critic panicked");
                stamped_error(critic.name(), "critic panicked during evaluation", profile, 1, 0)
            }
        }
    }

    async fn execute_parallel(&self, case: &Case, critics: &[Arc<dyn Critic>]) -> Vec<CriticOutput> {
        let case = Arc::new(case.clone());
        let mut handles = Vec::with_capacity(critics.len());

        for critic in critics {
            let semaphore = Arc::clone(&self.concurrency_limiter);
            let critic = Arc::clone(critic);
            let case = Arc::clone(&case);
            let policy = self.retry_policy.clone();
            let attempt_timeout = self.attempt_timeout();
            let profile = self.profile_for(critic.name());

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                invoke_critic(critic.as_ref(), &case, &policy, attempt_timeout, profile).await
            });

            handles.push(handle);
        }

        // Collect in registration order
        let mut outputs = Vec::with_capacity(handles.len());
        for (critic, handle) in critics.iter().zip(handles) {
            match handle.await {
                Ok(output) => outputs.push(output),
                Err(join_error) => {
                    error!(critic = critic.name(), error = %join_error, "Critic task failed");
                    outputs.push(stamped_error(
                        critic.name(),
                        &format!("critic task failed: {join_error}"),
                        self.profile_for(critic.name()),
                        1,
                        0,
                    ));
                }
            }
        }

        outputs
    }
}

/// Invoke one critic with retries and a per-attempt timeout.
async fn invoke_critic(
    critic: &dyn Critic,
    case: &Case,
    policy: &RetryPolicy,
    attempt_timeout: Duration,
    profile: CriticProfile,
) -> CriticOutput {
    let started = Instant::now();

    let outcome = policy
        .execute(move || async move {
            match timeout(attempt_timeout, critic.evaluate(case)).await {
                Ok(result) => result,
                Err(_) => Err(CriticError::Timeout(attempt_timeout)),
            }
        })
        .await;

    let latency_ms = started.elapsed().as_millis() as u64;

    match outcome.result {
        Ok(evaluation) => {
            debug!(
                critic = critic.name(),
                verdict = %evaluation.verdict,
                confidence = evaluation.confidence,
                attempts = outcome.attempts,
                latency_ms,
                "Critic evaluated case"
            );

            let confidence = if evaluation.verdict == Verdict::Error {
                0.0
            } else {
                evaluation.confidence
            };

            CriticOutput {
                critic_name: critic.name().to_string(),
                verdict: evaluation.verdict,
                confidence,
                weight: profile.weight,
                priority: profile.priority,
                justification: evaluation.justification,
                risk_flags: evaluation.risk_flags,
                attempts: outcome.attempts,
                latency_ms,
            }
        }
        Err(err) => {
            warn!(
                critic = critic.name(),
                error = %err,
                attempts = outcome.attempts,
                "Critic failed, recording ERROR verdict"
            );
            stamped_error(critic.name(), &err.to_string(), profile, outcome.attempts, latency_ms)
        }
    }
}

fn stamped_error(
    critic: &str,
    reason: &str,
    profile: CriticProfile,
    attempts: u32,
    latency_ms: u64,
) -> CriticOutput {
    CriticOutput {
        weight: profile.weight,
        priority: profile.priority,
        attempts,
        latency_ms,
        ..CriticOutput::error(critic, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RetryConfig;
    use crate::domain::ports::CriticEvaluation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    struct FixedCritic {
        name: String,
        verdict: Verdict,
        confidence: f64,
        delay: Duration,
    }

    #[async_trait]
    impl Critic for FixedCritic {
        fn name(&self) -> &str {
            &self.name
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            tokio::time::sleep(self.delay).await;
            Ok(CriticEvaluation::new(self.verdict, self.confidence, "fixed"))
        }
    }

    struct FlakyCritic {
        failures_before_success: u32,
        calls: AtomicU32,
        error: CriticError,
    }

    #[async_trait]
    impl Critic for FlakyCritic {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(self.error.clone())
            } else {
                Ok(CriticEvaluation::new(Verdict::Allow, 0.8, "recovered"))
            }
        }
    }

    struct PanickingCritic;

    #[async_trait]
    impl Critic for PanickingCritic {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            panic!("boom");
        }
    }

    /// Tracks the highest number of concurrent evaluations.
    struct GaugedCritic {
        name: String,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Critic for GaugedCritic {
        fn name(&self) -> &str {
            &self.name
        }

        async fn evaluate(&self, _case: &Case) -> Result<CriticEvaluation, CriticError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(CriticEvaluation::new(Verdict::Allow, 0.9, "gauged"))
        }
    }

    fn fast_config(max_parallel: usize) -> ExecutorConfig {
        ExecutorConfig {
            max_parallel_critics: max_parallel,
            critic_timeout_ms: 200,
            retry: RetryConfig {
                max_retry_attempts: 3,
                retry_backoff_min_ms: 1,
                retry_backoff_max_ms: 5,
                retry_backoff_multiplier: 2.0,
            },
        }
    }

    fn fixed(name: &str, verdict: Verdict, delay_ms: u64) -> Arc<dyn Critic> {
        Arc::new(FixedCritic {
            name: name.to_string(),
            verdict,
            confidence: 0.9,
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_empty_panel_returns_no_outputs() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());
        let outputs = executor.execute(&Case::new("text"), &[]).await;
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_outputs_follow_registration_order() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());
        let critics = vec![
            fixed("slow", Verdict::Block, 40),
            fixed("medium", Verdict::Review, 20),
            fixed("fast", Verdict::Allow, 0),
        ];

        let outputs = executor.execute(&Case::new("text"), &critics).await;
        let names: Vec<_> = outputs.iter().map(|o| o.critic_name.as_str()).collect();
        assert_eq!(names, vec!["slow", "medium", "fast"]);
        assert_eq!(outputs[0].verdict, Verdict::Block);
        assert_eq!(outputs[2].verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_weights_and_priorities_are_stamped() {
        let mut panel = PanelConfig::default();
        panel.critic_weights.insert("safety".to_string(), 2.5);
        panel
            .critic_priorities
            .insert("safety".to_string(), CriticPriority::Override);

        let executor = CriticExecutor::new(fast_config(4), panel);
        let critics = vec![fixed("safety", Verdict::Block, 0), fixed("style", Verdict::Allow, 0)];
        let outputs = executor.execute(&Case::new("text"), &critics).await;

        assert!((outputs[0].weight - 2.5).abs() < f64::EPSILON);
        assert_eq!(outputs[0].priority, CriticPriority::Override);
        assert!((outputs[1].weight - 1.0).abs() < f64::EPSILON);
        assert_eq!(outputs[1].priority, CriticPriority::None);
    }

    #[tokio::test]
    async fn test_retryable_failure_recovers() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());
        let critic: Arc<dyn Critic> = Arc::new(FlakyCritic {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
            error: CriticError::Connection("reset by peer".into()),
        });

        let outputs = executor.execute(&Case::new("text"), &[critic]).await;
        assert_eq!(outputs[0].verdict, Verdict::Allow);
        assert_eq!(outputs[0].attempts, 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_error_verdict() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());
        let critics: Vec<Arc<dyn Critic>> = vec![
            Arc::new(FlakyCritic {
                failures_before_success: 10,
                calls: AtomicU32::new(0),
                error: CriticError::RateLimited,
            }),
            fixed("steady", Verdict::Allow, 0),
        ];

        let outputs = executor.execute(&Case::new("text"), &critics).await;
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].verdict, Verdict::Error);
        assert!(outputs[0].confidence.abs() < f64::EPSILON);
        assert_eq!(outputs[0].attempts, 3);
        assert!(outputs[0].justification.contains("Rate limited"));
        assert_eq!(outputs[1].verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_fatal_failure_is_not_retried() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());
        let critic: Arc<dyn Critic> = Arc::new(FlakyCritic {
            failures_before_success: 10,
            calls: AtomicU32::new(0),
            error: CriticError::Malformed("no verdict field".into()),
        });

        let outputs = executor.execute(&Case::new("text"), &[critic]).await;
        assert_eq!(outputs[0].verdict, Verdict::Error);
        assert_eq!(outputs[0].attempts, 1);
        assert!(outputs[0].justification.contains("no verdict field"));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_demoted() {
        let mut config = fast_config(4);
        config.critic_timeout_ms = 10;
        config.retry.max_retry_attempts = 2;
        let executor = CriticExecutor::new(config, PanelConfig::default());

        let critics = vec![fixed("glacial", Verdict::Allow, 500), fixed("quick", Verdict::Allow, 0)];
        let outputs = executor.execute(&Case::new("text"), &critics).await;

        assert_eq!(outputs[0].verdict, Verdict::Error);
        assert_eq!(outputs[0].attempts, 2);
        assert!(outputs[0].justification.contains("Timed out"));
        assert_eq!(outputs[1].verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_panicking_critic_is_isolated() {
        let executor = CriticExecutor::new(fast_config(4), PanelConfig::default());

        let single: Vec<Arc<dyn Critic>> = vec![Arc::new(PanickingCritic)];
        let outputs = executor.execute(&Case::new("text"), &single).await;
        assert_eq!(outputs[0].verdict, Verdict::Error);

        let panel: Vec<Arc<dyn Critic>> = vec![Arc::new(PanickingCritic), fixed("ok", Verdict::Allow, 0)];
        let outputs = executor.execute(&Case::new("text"), &panel).await;
        assert_eq!(outputs[0].verdict, Verdict::Error);
        assert_eq!(outputs[1].verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = CriticExecutor::new(fast_config(2), PanelConfig::default());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let critics: Vec<Arc<dyn Critic>> = (0..6)
            .map(|i| {
                Arc::new(GaugedCritic {
                    name: format!("critic-{i}"),
                    active: Arc::clone(&active),
                    peak: Arc::clone(&peak),
                }) as Arc<dyn Critic>
            })
            .collect();

        let outputs = executor.execute(&Case::new("text"), &critics).await;
        assert_eq!(outputs.len(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
