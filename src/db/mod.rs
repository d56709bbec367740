//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `store.rs`: sqlx-backed store for audits, findings and user tokens

pub mod models;
pub mod schema;
pub mod store;

pub use models::{AuditJob, AuditStatus, Finding, NewFinding, Severity, UserToken};
pub use schema::SQLITE_INIT;
pub use store::{AuditStore, FindingFilter, SqlitePool, connect};
