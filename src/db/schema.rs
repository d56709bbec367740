//! SQL DDL for initializing the audit storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema:
/// - `audits`: one row per audit run; status written by the engine only.
///   The partial UNIQUE index enforces at most one PENDING/RUNNING audit
///   per repository.
/// - `findings`: append-only, bulk-inserted when an audit completes.
/// - `user_tokens`: one row per GitHub user id, last write wins.
///
/// Timestamps are RFC3339 TEXT; lexicographic order matches chronological
/// order for UTC timestamps, which the latest-audit query relies on.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS audits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    total_findings INTEGER NOT NULL DEFAULT 0,
    critical_count INTEGER NOT NULL DEFAULT 0,
    high_count INTEGER NOT NULL DEFAULT 0,
    medium_count INTEGER NOT NULL DEFAULT 0,
    low_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT NULL
);

CREATE INDEX IF NOT EXISTS idx_audits_repository_id ON audits(repository_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_audits_repo_in_flight
    ON audits(repository_id) WHERE status IN ('PENDING', 'RUNNING');

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    audit_id INTEGER NOT NULL REFERENCES audits(id),
    severity TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    file_path TEXT NOT NULL,
    line_number INTEGER NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_findings_audit_severity ON findings(audit_id, severity);

CREATE TABLE IF NOT EXISTS user_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    github_id INTEGER NOT NULL UNIQUE,
    username TEXT NOT NULL,
    access_token TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
