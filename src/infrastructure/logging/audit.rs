//! Audit sinks for decision bundles
//!
//! - `JsonlAuditSink`: one JSON line per decision, appended to a file, plus a
//!   tracing event
//! - `TracingAuditSink`: the tracing event only

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::domain::models::DecisionBundle;
use crate::domain::ports::AuditSink;

fn emit_decision_event(bundle: &DecisionBundle) {
    info!(
        target: "tribunal::audit",
        request_id = %bundle.request_id,
        case_id = %bundle.case_id,
        verdict = %bundle.overall_verdict(),
        final_action = %bundle.final_action,
        conflicts = bundle.conflict_summary.total,
        errors = bundle.error_count(),
        from_cache = bundle.from_cache,
        "decision recorded"
    );
}

/// Append-only JSON Lines audit trail
#[derive(Clone)]
pub struct JsonlAuditSink {
    path: PathBuf,
    log_file: Arc<Mutex<File>>,
}

impl JsonlAuditSink {
    /// Open (or create) the audit file in append mode
    ///
    /// Creates parent directories if they don't exist.
    pub async fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref();

        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create audit log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("failed to open audit log {}", log_path.display()))?;

        Ok(Self {
            path: log_path.to_path_buf(),
            log_file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn log_decision(&self, bundle: &DecisionBundle) -> Result<()> {
        let json = serde_json::to_string(bundle).context("failed to serialize decision bundle")?;

        {
            let mut file = self
                .log_file
                .lock()
                .map_err(|e| anyhow::anyhow!("audit log mutex poisoned: {e}"))?;

            writeln!(file, "{json}").context("failed to write audit record")?;
            file.flush().context("failed to flush audit log")?;
        }

        emit_decision_event(bundle);
        Ok(())
    }
}

/// Audit sink that only emits structured tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log_decision(&self, bundle: &DecisionBundle) -> Result<()> {
        emit_decision_event(bundle);
        Ok(())
    }
}
