use async_trait::async_trait;

use crate::domain::models::DecisionBundle;

/// Fire-and-forget observability sink for decision bundles.
///
/// Errors are reported back so the caller can log them, but they never change
/// the decision returned to the caller.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_decision(&self, bundle: &DecisionBundle) -> anyhow::Result<()>;
}
