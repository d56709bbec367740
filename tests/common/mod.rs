#![allow(dead_code)]

use futures::future::BoxFuture;
use jsonwebtoken::EncodingKey;
use repolens::db::{AuditStore, NewFinding, Severity};
use repolens::service::engine::{AuditEngine, AuditRequest, JobContext};
use repolens::{LensError, LensState, lens_router};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Engine stub that accepts the handoff and does nothing, leaving the
/// audit PENDING so tests can observe the freshly created row.
pub struct IdleEngine;

impl AuditEngine for IdleEngine {
    fn run(
        &self,
        _ctx: JobContext,
        _req: AuditRequest,
    ) -> BoxFuture<'static, Result<(), LensError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Engine stub that completes immediately with a fixed findings batch.
pub struct CompletingEngine(pub Vec<NewFinding>);

impl AuditEngine for CompletingEngine {
    fn run(
        &self,
        ctx: JobContext,
        _req: AuditRequest,
    ) -> BoxFuture<'static, Result<(), LensError>> {
        let findings = self.0.clone();
        Box::pin(async move {
            ctx.mark_running().await?;
            ctx.complete(findings).await
        })
    }
}

/// Engine stub whose run errors out; dispatch should record the failure.
pub struct FailingEngine;

impl AuditEngine for FailingEngine {
    fn run(
        &self,
        _ctx: JobContext,
        _req: AuditRequest,
    ) -> BoxFuture<'static, Result<(), LensError>> {
        Box::pin(async { Err(LensError::OauthFlow("simulated engine crash".to_string())) })
    }
}

pub async fn temp_store(tag: &str) -> (AuditStore, PathBuf) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "repolens-{}-{}-{}.sqlite",
        tag,
        std::process::id(),
        nanos
    ));

    let database_url = format!("sqlite:{}", temp_path.display());
    let pool = repolens::db::connect(&database_url)
        .await
        .expect("failed to open temp sqlite");
    let store = AuditStore::new(pool);
    store.init_schema().await.expect("failed to init schema");
    (store, temp_path)
}

pub fn app_with(store: AuditStore, engine: Arc<dyn AuditEngine>) -> axum::Router {
    lens_router(LensState::new(store, engine))
}

/// Mint a JWT the router's auth extractor will accept (same secret the
/// state derives from CONFIG).
pub fn test_jwt(github_id: i64, username: &str) -> String {
    let key = EncodingKey::from_secret(repolens::config::CONFIG.jwt_secret.as_bytes());
    repolens::jwt::mint(username, github_id, Duration::from_secs(3600), &key)
        .expect("failed to mint test jwt")
}

/// Insert an audit row with an explicit created_at, bypassing the store's
/// in-flight guard; used to stage history for the latest-audit queries.
pub async fn seed_audit(
    store: &AuditStore,
    repository_id: i64,
    status: &str,
    created_at: &str,
) -> i64 {
    let res = sqlx::query(
        "INSERT INTO audits (repository_id, status, created_at, updated_at) VALUES (?, ?, ?, ?)",
    )
    .bind(repository_id)
    .bind(status)
    .bind(created_at)
    .bind(created_at)
    .execute(store.pool())
    .await
    .expect("failed to seed audit");
    res.last_insert_rowid()
}

/// Insert a finding with an explicit created_at so ordering assertions can
/// exercise the real sort.
pub async fn seed_finding(
    store: &AuditStore,
    audit_id: i64,
    severity: Severity,
    category: &str,
    created_at: &str,
) -> i64 {
    let res = sqlx::query(
        "INSERT INTO findings (audit_id, severity, category, description, file_path, line_number, created_at) \
         VALUES (?, ?, ?, ?, ?, NULL, ?)",
    )
    .bind(audit_id)
    .bind(severity.as_str())
    .bind(category)
    .bind(format!("{category} issue"))
    .bind("src/lib.rs")
    .bind(created_at)
    .execute(store.pool())
    .await
    .expect("failed to seed finding");
    res.last_insert_rowid()
}

pub fn finding(severity: Severity, category: &str) -> NewFinding {
    NewFinding {
        severity,
        category: category.to_string(),
        description: format!("{category} issue"),
        file_path: "src/lib.rs".to_string(),
        line_number: Some(42),
    }
}
