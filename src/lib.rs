pub mod config;
pub mod db;
pub mod error;
pub mod github_oauth;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

pub use error::LensError;
pub use router::{LensState, lens_router};
pub use service::engine::{AuditEngine, NoopEngine};
