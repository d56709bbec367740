use crate::config::CONFIG;
use crate::error::LensError;
use crate::github_oauth::{GithubOauthEndpoints, GithubOauthService};
use crate::jwt;
use crate::router::LensState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use oauth2::AuthorizationCode;
use serde::Deserialize;
use std::time::Duration as StdDuration;
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

const CSRF_COOKIE: &str = "oauth_csrf_token";

/// GET /auth/login -> redirects to GitHub's consent page.
pub async fn github_login(jar: PrivateCookieJar) -> Result<impl IntoResponse, LensError> {
    let (auth_url, csrf_token) = GithubOauthEndpoints::build_authorize_url()?;
    let jar = jar.add(build_cookie(CSRF_COOKIE, csrf_token.secret().to_string()));

    info!("Dispatching OAuth redirect to GitHub");
    Ok((jar, Redirect::temporary(auth_url.as_ref())))
}

/// GET /auth/callback -> exchanges the code, upserts the user's token,
/// mints a JWT and sends the browser back to the frontend with the token in
/// the URL fragment.
///
/// The caller is a browser mid-redirect, so every failure becomes a
/// redirect to the frontend login page with an error marker; the detail is
/// only logged server-side.
pub async fn github_callback(
    State(state): State<LensState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let Some(csrf_cookie) = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned()) else {
        return respond_with_error(
            jar,
            "session_expired",
            LensError::OauthFlow("missing CSRF cookie".to_string()),
        );
    };
    let jar = jar.remove(clear_cookie(CSRF_COOKIE));

    let state_param = match query.state.as_deref() {
        Some(s) => s,
        None => {
            return respond_with_error(
                jar,
                "missing_state",
                LensError::OauthFlow("missing `state` in callback".to_string()),
            );
        }
    };
    if !bool::from(state_param.as_bytes().ct_eq(csrf_cookie.as_bytes())) {
        return respond_with_error(
            jar,
            "state_mismatch",
            LensError::OauthFlow("CSRF token mismatch".to_string()),
        );
    }

    let code = match query.code.as_deref() {
        Some(code) => code,
        None => {
            return respond_with_error(
                jar,
                "missing_code",
                LensError::OauthFlow("missing `code` in callback".to_string()),
            );
        }
    };

    let access_token = match GithubOauthEndpoints::exchange_authorization_code(
        AuthorizationCode::new(code.to_owned()),
        state.http().clone(),
    )
    .await
    {
        Ok(token) => token,
        Err(err) => return respond_with_error(jar, "exchange_failed", err),
    };

    let user = match GithubOauthService::fetch_user_with_retry(&access_token, state.http().clone())
        .await
    {
        Ok(user) => user,
        Err(err) => return respond_with_error(jar, "userinfo_failed", err),
    };

    if let Err(err) = state
        .store()
        .upsert_user_token(user.id, &user.login, &access_token)
        .await
    {
        return respond_with_error(jar, "persist_failed", err);
    }

    let token = match jwt::mint(
        &user.login,
        user.id,
        StdDuration::from_secs(CONFIG.jwt_ttl_secs),
        state.jwt_encoding(),
    ) {
        Ok(token) => token,
        Err(err) => return respond_with_error(jar, "jwt_failed", err),
    };

    info!(github_id = user.id, login = %user.login, "OAuth callback stored token, issuing JWT");
    // Fragment, not query parameter: fragments never reach access logs or
    // intermediate proxies.
    let redirect = format!("{}/auth/callback#token={}", frontend_base(), token);
    (jar, Redirect::temporary(&redirect)).into_response()
}

fn frontend_base() -> String {
    CONFIG.frontend_url.as_str().trim_end_matches('/').to_string()
}

fn respond_with_error(jar: PrivateCookieJar, reason: &str, err: LensError) -> Response {
    error!(reason, error = %err, "OAuth callback failed");
    let redirect = format!("{}/login?error={}", frontend_base(), reason);
    (jar, Redirect::temporary(&redirect)).into_response()
}

fn build_cookie(name: &str, value: String) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}
