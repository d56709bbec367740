use crate::db::models::{AuditJob, Finding, NewFinding, Severity, UserToken};
use crate::db::schema::SQLITE_INIT;
use crate::error::LensError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

/// Open (creating if missing) the SQLite database behind `database_url`.
pub async fn connect(database_url: &str) -> Result<SqlitePool, LensError> {
    let opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(opts).await?;
    Ok(pool)
}

/// Sort clause shared by every findings query: severity rank descending,
/// then newest first, row id as the stable tiebreak.
const FINDINGS_ORDER: &str = "ORDER BY CASE severity \
     WHEN 'CRITICAL' THEN 3 WHEN 'HIGH' THEN 2 WHEN 'MEDIUM' THEN 1 ELSE 0 END DESC, \
     created_at DESC, id DESC";

/// Optional restrictions applied by the findings pager. Unset fields mean
/// no restriction.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub severity: Option<Severity>,
    pub category: Option<String>,
}

#[derive(Clone)]
pub struct AuditStore {
    pool: SqlitePool,
}

impl AuditStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), LensError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Create a PENDING audit row for the repository and return its id.
    /// Refuses to create a second row while one is still in flight; the
    /// check-then-insert runs in a transaction and the partial unique index
    /// backstops it against races.
    pub async fn insert_audit(&self, repository_id: i64) -> Result<i64, LensError> {
        let mut tx = self.pool.begin().await?;

        let in_flight: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM audits WHERE repository_id = ? AND status IN ('PENDING', 'RUNNING')",
        )
        .bind(repository_id)
        .fetch_optional(&mut *tx)
        .await?;
        if in_flight.is_some() {
            return Err(LensError::AuditInFlight { repository_id });
        }

        let now = Utc::now().to_rfc3339();
        let res = sqlx::query(
            "INSERT INTO audits (repository_id, status, created_at, updated_at) \
             VALUES (?, 'PENDING', ?, ?)",
        )
        .bind(repository_id)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn get_audit(&self, audit_id: i64) -> Result<Option<AuditJob>, LensError> {
        let row = sqlx::query(
            "SELECT id, repository_id, status, created_at, updated_at, total_findings, \
             critical_count, high_count, medium_count, low_count, error_message \
             FROM audits WHERE id = ?",
        )
        .bind(audit_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_audit).transpose()
    }

    /// Most recently created audit for the repository, or None when the
    /// repository has never been audited.
    pub async fn latest_for_repository(
        &self,
        repository_id: i64,
    ) -> Result<Option<AuditJob>, LensError> {
        let row = sqlx::query(
            "SELECT id, repository_id, status, created_at, updated_at, total_findings, \
             critical_count, high_count, medium_count, low_count, error_message \
             FROM audits WHERE repository_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(repository_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_audit).transpose()
    }

    pub async fn mark_running(&self, audit_id: i64) -> Result<(), LensError> {
        sqlx::query("UPDATE audits SET status = 'RUNNING', updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(audit_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bulk-insert the engine's findings and flip the audit to COMPLETED
    /// with summary counts derived from the same batch, in one transaction.
    pub async fn complete_audit(
        &self,
        audit_id: i64,
        findings: &[NewFinding],
    ) -> Result<(), LensError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for f in findings {
            sqlx::query(
                "INSERT INTO findings (audit_id, severity, category, description, file_path, line_number, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(audit_id)
            .bind(f.severity.as_str())
            .bind(&f.category)
            .bind(&f.description)
            .bind(&f.file_path)
            .bind(f.line_number)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        let count_of = |sev: Severity| findings.iter().filter(|f| f.severity == sev).count() as i64;
        sqlx::query(
            "UPDATE audits SET status = 'COMPLETED', total_findings = ?, critical_count = ?, \
             high_count = ?, medium_count = ?, low_count = ?, error_message = NULL, updated_at = ? \
             WHERE id = ?",
        )
        .bind(findings.len() as i64)
        .bind(count_of(Severity::Critical))
        .bind(count_of(Severity::High))
        .bind(count_of(Severity::Medium))
        .bind(count_of(Severity::Low))
        .bind(&now)
        .bind(audit_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn fail_audit(&self, audit_id: i64, message: &str) -> Result<(), LensError> {
        sqlx::query("UPDATE audits SET status = 'FAILED', error_message = ?, updated_at = ? WHERE id = ?")
            .bind(message)
            .bind(Utc::now().to_rfc3339())
            .bind(audit_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// One page of findings plus the total row count under the same filter.
    /// `page` is zero-based; `size` must already be clamped by the caller.
    pub async fn list_findings(
        &self,
        audit_id: i64,
        filter: &FindingFilter,
        page: u32,
        size: u32,
    ) -> Result<(Vec<Finding>, i64), LensError> {
        let mut where_clause =
            String::from("FROM findings WHERE audit_id = ?");
        if filter.severity.is_some() {
            where_clause.push_str(" AND severity = ?");
        }
        if filter.category.is_some() {
            where_clause.push_str(" AND category = ?");
        }

        let count_sql = format!("SELECT COUNT(*) {where_clause}");
        let mut count_q = sqlx::query_as::<_, (i64,)>(&count_sql).bind(audit_id);
        if let Some(sev) = filter.severity {
            count_q = count_q.bind(sev.as_str());
        }
        if let Some(cat) = filter.category.as_deref() {
            count_q = count_q.bind(cat);
        }
        let (total,) = count_q.fetch_one(&self.pool).await?;

        let page_sql = format!(
            "SELECT id, audit_id, severity, category, description, file_path, line_number, created_at \
             {where_clause} {FINDINGS_ORDER} LIMIT ? OFFSET ?"
        );
        let mut page_q = sqlx::query(&page_sql).bind(audit_id);
        if let Some(sev) = filter.severity {
            page_q = page_q.bind(sev.as_str());
        }
        if let Some(cat) = filter.category.as_deref() {
            page_q = page_q.bind(cat);
        }
        let rows = page_q
            .bind(size as i64)
            .bind(page as i64 * size as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_finding)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    /// Upsert by unique github_id, last write wins.
    /// Uses SQLite `INSERT ... ON CONFLICT(github_id) DO UPDATE`.
    pub async fn upsert_user_token(
        &self,
        github_id: i64,
        username: &str,
        access_token: &str,
    ) -> Result<(), LensError> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (github_id, username, access_token, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(github_id) DO UPDATE SET
                username=excluded.username,
                access_token=excluded.access_token,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(github_id)
        .bind(username)
        .bind(access_token)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_user_token(&self, github_id: i64) -> Result<Option<UserToken>, LensError> {
        let row = sqlx::query(
            "SELECT id, github_id, username, access_token, updated_at \
             FROM user_tokens WHERE github_id = ?",
        )
        .bind(github_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_user_token).transpose()
    }

    fn row_to_audit(row: SqliteRow) -> Result<AuditJob, LensError> {
        let status_str: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        Ok(AuditJob {
            id: row.try_get("id")?,
            repository_id: row.try_get("repository_id")?,
            status: status_str
                .parse()
                .map_err(|e: LensError| sqlx::Error::Decode(Box::new(e)))?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            total_findings: row.try_get("total_findings")?,
            critical_count: row.try_get("critical_count")?,
            high_count: row.try_get("high_count")?,
            medium_count: row.try_get("medium_count")?,
            low_count: row.try_get("low_count")?,
            error_message: row.try_get("error_message")?,
        })
    }

    fn row_to_finding(row: SqliteRow) -> Result<Finding, LensError> {
        let severity_str: String = row.try_get("severity")?;
        let created_at: String = row.try_get("created_at")?;
        Ok(Finding {
            id: row.try_get("id")?,
            audit_id: row.try_get("audit_id")?,
            severity: severity_str
                .parse()
                .map_err(|e: LensError| sqlx::Error::Decode(Box::new(e)))?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            file_path: row.try_get("file_path")?,
            line_number: row.try_get("line_number")?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    fn row_to_user_token(row: SqliteRow) -> Result<UserToken, LensError> {
        let updated_at: String = row.try_get("updated_at")?;
        Ok(UserToken {
            id: row.try_get("id")?,
            github_id: row.try_get("github_id")?,
            username: row.try_get("username")?,
            access_token: row.try_get("access_token")?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, LensError> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
        .with_timezone(&Utc);
    Ok(dt)
}
