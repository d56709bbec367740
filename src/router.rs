use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use base64::Engine;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::CONFIG;
use crate::db::store::AuditStore;
use crate::handlers::audits::{get_audit_status, get_latest_audit, list_findings, start_audit};
use crate::handlers::health;
use crate::handlers::oauth::{github_callback, github_login};
use crate::middleware::rate_limit::{GlobalRateLimiter, build_limiter, rate_limit};
use crate::service::engine::AuditEngine;

#[derive(Clone)]
pub struct LensState {
    store: AuditStore,
    engine: Arc<dyn AuditEngine>,
    http: reqwest::Client,
    cookie_key: Key,
    jwt_encoding: EncodingKey,
    jwt_decoding: DecodingKey,
    limiter: Arc<GlobalRateLimiter>,
}

impl LensState {
    pub fn new(store: AuditStore, engine: Arc<dyn AuditEngine>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("repolens/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("FATAL: initialize OAuth HTTP client failed");

        let cookie_key = match CONFIG.cookie_key.as_deref() {
            Some(encoded) => match base64::engine::general_purpose::STANDARD.decode(encoded) {
                Ok(bytes) if bytes.len() >= 64 => Key::from(&bytes),
                _ => {
                    warn!("COOKIE_KEY unusable (want base64 of >= 64 bytes); generating ephemeral key");
                    Key::generate()
                }
            },
            None => Key::generate(),
        };

        let secret = CONFIG.jwt_secret.as_bytes();
        Self {
            store,
            engine,
            http,
            cookie_key,
            jwt_encoding: EncodingKey::from_secret(secret),
            jwt_decoding: DecodingKey::from_secret(secret),
            limiter: build_limiter(CONFIG.rate_limit_rps),
        }
    }

    pub fn store(&self) -> &AuditStore {
        &self.store
    }

    pub fn engine(&self) -> Arc<dyn AuditEngine> {
        self.engine.clone()
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn jwt_encoding(&self) -> &EncodingKey {
        &self.jwt_encoding
    }

    pub fn jwt_decoding(&self) -> &DecodingKey {
        &self.jwt_decoding
    }

    pub fn limiter(&self) -> &GlobalRateLimiter {
        &self.limiter
    }
}

// PrivateCookieJar extraction needs the signing key from state.
impl FromRef<LensState> for Key {
    fn from_ref(state: &LensState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the full application router.
pub fn lens_router(state: LensState) -> Router {
    let api_routes = Router::new()
        .route("/audits/start/{repository_id}", post(start_audit))
        .route("/audits/{audit_id}/status", get(get_audit_status))
        .route("/audits/{audit_id}/summary", get(get_audit_status))
        .route("/audits/{audit_id}/findings", get(list_findings))
        .route("/audits/latest/{repository_id}", get(get_latest_audit))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .nest("/api", api_routes)
        .route("/auth/login", get(github_login))
        .route("/auth/callback", get(github_callback))
        .route("/health", get(health))
        .with_state(state)
}
