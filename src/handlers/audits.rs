use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;

use crate::config::CONFIG;
use crate::db::models::Severity;
use crate::db::store::FindingFilter;
use crate::error::LensError;
use crate::middleware::AuthUser;
use crate::router::LensState;
use crate::service::{self, AuditRequest, JobContext};
use crate::types::api::{
    AuditStatusResponse, FindingListQuery, FindingResponse, PagedResponse, StartAuditResponse,
};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// POST /api/audits/start/{repository_id}
///
/// Creates a PENDING audit row, hands it to the engine and returns 202
/// immediately. The caller must have a GitHub token on record from a prior
/// OAuth login.
pub async fn start_audit(
    State(state): State<LensState>,
    Path(repository_id): Path<i64>,
    user: AuthUser,
) -> Result<(StatusCode, Json<StartAuditResponse>), LensError> {
    let token = state
        .store()
        .get_user_token(user.github_id)
        .await?
        .ok_or(LensError::TokenNotFound {
            github_id: user.github_id,
        })?;

    let audit_id = state.store().insert_audit(repository_id).await?;
    info!(
        audit_id,
        repository_id,
        user = %user.username,
        "audit started"
    );

    service::dispatch(
        state.engine(),
        JobContext::new(state.store().clone(), audit_id),
        AuditRequest {
            repository_id,
            access_token: token.access_token,
        },
    );

    Ok((StatusCode::ACCEPTED, Json(StartAuditResponse { audit_id })))
}

/// GET /api/audits/{audit_id}/status (and its alias /summary)
pub async fn get_audit_status(
    State(state): State<LensState>,
    Path(audit_id): Path<i64>,
) -> Result<Json<AuditStatusResponse>, LensError> {
    let audit = state
        .store()
        .get_audit(audit_id)
        .await?
        .ok_or(LensError::AuditNotFound { audit_id })?;
    Ok(Json(audit.into()))
}

/// GET /api/audits/latest/{repository_id}
///
/// 404 when the repository has never been audited; that is an expected
/// "none yet" answer for the frontend, not a failure.
pub async fn get_latest_audit(
    State(state): State<LensState>,
    Path(repository_id): Path<i64>,
) -> Result<Json<AuditStatusResponse>, LensError> {
    let audit = state
        .store()
        .latest_for_repository(repository_id)
        .await?
        .ok_or(LensError::NoAuditForRepository { repository_id })?;
    Ok(Json(audit.into()))
}

/// GET /api/audits/{audit_id}/findings?severity&category&page&size
///
/// Severity rank descending, newest first. Page size defaults to 20 and is
/// capped server-side whatever the client asks for.
pub async fn list_findings(
    State(state): State<LensState>,
    Path(audit_id): Path<i64>,
    Query(query): Query<FindingListQuery>,
) -> Result<Json<PagedResponse<FindingResponse>>, LensError> {
    if state.store().get_audit(audit_id).await?.is_none() {
        return Err(LensError::AuditNotFound { audit_id });
    }

    let filter = FindingFilter {
        severity: query
            .severity
            .as_deref()
            .map(|s| s.parse::<Severity>())
            .transpose()?,
        category: query.category,
    };
    let size = query
        .size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, CONFIG.max_page_size);

    let (findings, total) = state
        .store()
        .list_findings(audit_id, &filter, query.page, size)
        .await?;

    Ok(Json(PagedResponse::new(
        findings.into_iter().map(FindingResponse::from).collect(),
        query.page,
        size,
        total,
    )))
}
