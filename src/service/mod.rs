pub mod engine;

pub use engine::{AuditEngine, AuditRequest, JobContext, NoopEngine, dispatch};
