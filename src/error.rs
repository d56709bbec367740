use axum::{Json, http::StatusCode, response::IntoResponse};
use oauth2::basic::BasicErrorResponseType;
use oauth2::reqwest::Error as ReqwestClientError;
use oauth2::{HttpClientError, RequestTokenError, StandardErrorResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LensError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("OAuth2 token request error: {0}")]
    Oauth2Token(String),

    #[error("OAuth2 server error: {error}")]
    Oauth2Server { error: String },

    #[error("OAuth flow error: {0}")]
    OauthFlow(String),

    #[error("authentication error: {0}")]
    Unauthorized(String),

    #[error("no stored GitHub token for user {github_id}")]
    TokenNotFound { github_id: i64 },

    #[error("audit {audit_id} not found")]
    AuditNotFound { audit_id: i64 },

    #[error("no audit recorded for repository {repository_id}")]
    NoAuditForRepository { repository_id: i64 },

    #[error("an audit is already in flight for repository {repository_id}")]
    AuditInFlight { repository_id: i64 },

    #[error("unknown severity: {0}")]
    InvalidSeverity(String),

    #[error("unknown audit status: {0}")]
    InvalidStatus(String),

    #[error("rate limit exceeded")]
    RateLimited,
}

impl LensError {
    /// True when surfacing this error to the caller would leak internals;
    /// such errors are logged in full and returned as an opaque body.
    pub fn is_internal(&self) -> bool {
        matches!(self, LensError::Database(_) | LensError::Json(_))
    }

    /// Network-level failures worth retrying; OAuth server rejections and
    /// everything else are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LensError::Reqwest(_) | LensError::Oauth2Token(_))
    }
}

impl
    From<
        RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    > for LensError
{
    fn from(
        e: RequestTokenError<
            HttpClientError<ReqwestClientError>,
            StandardErrorResponse<BasicErrorResponseType>,
        >,
    ) -> Self {
        match e {
            RequestTokenError::ServerResponse(err) => LensError::Oauth2Server {
                error: err.error().to_string(),
            },
            RequestTokenError::Request(req_e) => {
                LensError::Oauth2Token(format!("request failed: {}", req_e))
            }
            RequestTokenError::Parse(parse_err, _body) => LensError::Json(parse_err.into_inner()),
            RequestTokenError::Other(s) => LensError::Oauth2Token(s),
        }
    }
}

impl IntoResponse for LensError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match &self {
            LensError::AuditNotFound { .. } | LensError::NoAuditForRepository { .. } => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: self.to_string(),
                },
            ),
            LensError::TokenNotFound { .. } => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "NO_PROVIDER_TOKEN".to_string(),
                    message: "No GitHub token on record; sign in with GitHub first.".to_string(),
                },
            ),
            LensError::Unauthorized(_) | LensError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication error.".to_string(),
                },
            ),
            LensError::AuditInFlight { .. } => (
                StatusCode::CONFLICT,
                ApiErrorBody {
                    code: "AUDIT_IN_FLIGHT".to_string(),
                    message: self.to_string(),
                },
            ),
            LensError::InvalidSeverity(_) | LensError::InvalidStatus(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: self.to_string(),
                },
            ),
            LensError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ApiErrorBody {
                    code: "RATE_LIMIT".to_string(),
                    message: "Too many requests; slow down.".to_string(),
                },
            ),
            LensError::Oauth2Token(_)
            | LensError::Oauth2Server { .. }
            | LensError::OauthFlow(_) => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "OAUTH_ERROR".to_string(),
                    message: "OAuth exchange failed.".to_string(),
                },
            ),
            LensError::Reqwest(_) | LensError::UrlParse(_) => (
                StatusCode::BAD_GATEWAY,
                ApiErrorBody {
                    code: "BAD_GATEWAY".to_string(),
                    message: "Upstream service is unavailable.".to_string(),
                },
            ),
            LensError::Database(_) | LensError::Json(_) => {
                tracing::error!(error = %self, "internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "An internal server error occurred.".to_string(),
                    },
                )
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
