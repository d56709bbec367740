use crate::config::{CONFIG, GITHUB_AUTH_URL, GITHUB_TOKEN_URL, GITHUB_USER_API};
use crate::error::LensError;

use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenResponse,
};
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, StandardRevocableToken, TokenResponse,
    TokenUrl,
};
use serde::Deserialize;
use tracing::info;
use url::Url;

/// Stateless GitHub OAuth endpoints.
pub struct GithubOauthEndpoints;

/// The authenticated GitHub user, as returned by the user API.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
}

impl GithubOauthEndpoints {
    /// Build the GitHub consent-page URL together with a fresh CSRF state.
    pub fn build_authorize_url() -> Result<(Url, CsrfToken), LensError> {
        let client = build_oauth2_client()?;
        let (url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("repo".to_string()))
            .add_scope(Scope::new("read:user".to_string()))
            .url();
        Ok((url, csrf))
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_authorization_code(
        code: AuthorizationCode,
        http_client: reqwest::Client,
    ) -> Result<String, LensError> {
        let client = build_oauth2_client()?;
        let token_result: BasicTokenResponse =
            client.exchange_code(code).request_async(&http_client).await?;
        info!("GitHub authorization code exchanged");
        Ok(token_result.access_token().secret().clone())
    }

    /// Fetch id and login of the token's owner from the GitHub user API.
    pub async fn fetch_authenticated_user(
        access_token: &str,
        http_client: reqwest::Client,
    ) -> Result<GithubUser, LensError> {
        let user: GithubUser = http_client
            .get(GITHUB_USER_API)
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(github_id = user.id, login = %user.login, "Fetched GitHub user");
        Ok(user)
    }
}

/// Build the GitHub OAuth2 client from configuration.
fn build_oauth2_client() -> Result<GithubOauth2Client, LensError> {
    let client = OAuth2Client::new(ClientId::new(CONFIG.github_client_id.clone()))
        .set_client_secret(ClientSecret::new(CONFIG.github_client_secret.clone()))
        .set_auth_uri(AuthUrl::new(GITHUB_AUTH_URL.to_string())?)
        .set_token_uri(TokenUrl::new(GITHUB_TOKEN_URL.to_string())?)
        .set_redirect_uri(RedirectUrl::new(CONFIG.oauth_redirect_url.to_string())?);
    Ok(client)
}

pub type GithubOauth2Client = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;
