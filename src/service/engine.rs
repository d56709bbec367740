//! Seam between the HTTP layer and the audit engine proper.
//!
//! The engine that actually analyzes a repository snapshot is an external
//! collaborator; this module owns only the handoff: a trait the engine
//! implements, the status/findings write API it is handed, and the
//! fire-and-forget dispatch used by `start`.

use crate::db::models::NewFinding;
use crate::db::store::AuditStore;
use crate::error::LensError;
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything an engine needs to run one audit.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub repository_id: i64,
    /// The caller's stored GitHub token, for cloning/reading the repository.
    pub access_token: String,
}

/// Write-side handle an engine uses to report progress for one audit row.
/// Status transitions after PENDING are owned exclusively by this type.
#[derive(Clone)]
pub struct JobContext {
    store: AuditStore,
    audit_id: i64,
}

impl JobContext {
    pub fn new(store: AuditStore, audit_id: i64) -> Self {
        Self { store, audit_id }
    }

    pub fn audit_id(&self) -> i64 {
        self.audit_id
    }

    pub async fn mark_running(&self) -> Result<(), LensError> {
        self.store.mark_running(self.audit_id).await
    }

    /// Record the findings batch and flip the audit to COMPLETED. Summary
    /// counts are derived from the batch inside one transaction.
    pub async fn complete(&self, findings: Vec<NewFinding>) -> Result<(), LensError> {
        let count = findings.len();
        self.store.complete_audit(self.audit_id, &findings).await?;
        info!(audit_id = self.audit_id, findings = count, "audit completed");
        Ok(())
    }

    pub async fn fail(&self, message: &str) -> Result<(), LensError> {
        self.store.fail_audit(self.audit_id, message).await
    }
}

pub trait AuditEngine: Send + Sync + 'static {
    fn run(&self, ctx: JobContext, req: AuditRequest) -> BoxFuture<'static, Result<(), LensError>>;
}

/// Hand one audit to the engine without awaiting its completion. A failed
/// run marks the row FAILED so pollers are never left on RUNNING forever.
pub fn dispatch(engine: Arc<dyn AuditEngine>, ctx: JobContext, req: AuditRequest) {
    tokio::spawn(async move {
        let audit_id = ctx.audit_id();
        info!(audit_id, repository_id = req.repository_id, "dispatching audit to engine");
        if let Err(e) = engine.run(ctx.clone(), req).await {
            error!(audit_id, error = %e, "audit engine run failed");
            if let Err(db_err) = ctx.fail(&e.to_string()).await {
                warn!(audit_id, error = %db_err, "failed to record audit failure");
            }
        }
    });
}

/// Placeholder engine wired by the default binary: completes immediately
/// with zero findings, so the start/poll flow works end to end before a
/// real engine is attached.
pub struct NoopEngine;

impl AuditEngine for NoopEngine {
    fn run(&self, ctx: JobContext, req: AuditRequest) -> BoxFuture<'static, Result<(), LensError>> {
        Box::pin(async move {
            info!(
                audit_id = ctx.audit_id(),
                repository_id = req.repository_id,
                "noop engine: completing with no findings"
            );
            ctx.mark_running().await?;
            ctx.complete(Vec::new()).await
        })
    }
}
