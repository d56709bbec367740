use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

use crate::error::LensError;
use crate::router::LensState;

pub type GlobalRateLimiter = governor::DefaultDirectRateLimiter;

pub fn build_limiter(requests_per_second: u32) -> Arc<GlobalRateLimiter> {
    let rps = NonZeroU32::new(requests_per_second.max(1)).expect("non-zero after max(1)");
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Global limiter for the `/api` surface; the OAuth redirect flow is left
/// alone since the browser drives it.
pub async fn rate_limit(State(state): State<LensState>, request: Request, next: Next) -> Response {
    if state.limiter().check().is_err() {
        warn!(path = %request.uri().path(), "rate limit exceeded");
        return LensError::RateLimited.into_response();
    }
    next.run(request).await
}
