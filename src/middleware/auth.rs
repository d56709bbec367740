use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::error::LensError;
use crate::jwt;
use crate::router::LensState;

/// Typed identity of the authenticated caller, populated from the verified
/// JWT. Handlers take this as an argument instead of digging claims out of
/// request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub github_id: i64,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    LensState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LensError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| LensError::Unauthorized("missing bearer token".to_string()))?;

        let app = LensState::from_ref(state);
        let claims = jwt::verify(bearer.token(), app.jwt_decoding())?;
        Ok(AuthUser {
            github_id: claims.uid,
            username: claims.sub,
        })
    }
}
