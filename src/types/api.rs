use crate::db::models::{AuditJob, AuditStatus, Finding, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct StartAuditResponse {
    pub audit_id: i64,
}

/// Status view served by both `/status` and `/summary`. Summary counts are
/// only meaningful once the audit has completed; error_message only when it
/// has failed.
#[derive(Debug, Serialize)]
pub struct AuditStatusResponse {
    pub audit_id: i64,
    pub repository_id: i64,
    pub status: AuditStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_findings: i64,
    pub critical_count: i64,
    pub high_count: i64,
    pub medium_count: i64,
    pub low_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<AuditJob> for AuditStatusResponse {
    fn from(a: AuditJob) -> Self {
        Self {
            audit_id: a.id,
            repository_id: a.repository_id,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
            total_findings: a.total_findings,
            critical_count: a.critical_count,
            high_count: a.high_count,
            medium_count: a.medium_count,
            low_count: a.low_count,
            error_message: a.error_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindingResponse {
    pub id: i64,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Finding> for FindingResponse {
    fn from(f: Finding) -> Self {
        Self {
            id: f.id,
            severity: f.severity,
            category: f.category,
            description: f.description,
            file_path: f.file_path,
            line_number: f.line_number,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FindingListQuery {
    pub severity: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub page: u32,
    pub size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> PagedResponse<T> {
    pub fn new(items: Vec<T>, page: u32, size: u32, total_items: i64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            (total_items + size as i64 - 1) / size as i64
        };
        Self {
            items,
            page,
            size,
            total_items,
            total_pages,
        }
    }
}
