use figment::{Figment, providers::Env};
use serde::Deserialize;
use std::sync::LazyLock;
use url::Url;

/// Process-wide configuration, extracted once from `REPOLENS_`-prefixed
/// environment variables. Every field has a development default so the
/// server (and the test suite) can come up without a populated environment.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Figment::new()
        .merge(Env::prefixed("REPOLENS_"))
        .extract()
        .unwrap_or_else(|e| panic!("invalid configuration: {e}"))
});

pub const GITHUB_AUTH_URL: &str = "https://github.com/login/oauth/authorize";
pub const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const GITHUB_USER_API: &str = "https://api.github.com/user";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_loglevel")]
    pub loglevel: String,

    /// Base URL of the frontend SPA; the OAuth callback redirects here.
    #[serde(default = "default_frontend_url")]
    pub frontend_url: Url,

    #[serde(default)]
    pub github_client_id: String,

    #[serde(default)]
    pub github_client_secret: String,

    /// Our own callback URL as registered with the GitHub OAuth app.
    #[serde(default = "default_oauth_redirect_url")]
    pub oauth_redirect_url: Url,

    /// HS256 secret for the JWTs handed to the frontend.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_ttl_secs")]
    pub jwt_ttl_secs: u64,

    /// Base64-encoded 64-byte key for the private CSRF cookie jar.
    /// A random key is generated when unset (cookies then do not survive
    /// a restart, which is acceptable for a 15-minute OAuth handshake).
    #[serde(default)]
    pub cookie_key: Option<String>,

    /// Hard cap on the findings page size regardless of what the client asks for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    #[serde(default = "default_rate_limit_rps")]
    pub rate_limit_rps: u32,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_url() -> String {
    "sqlite:repolens.sqlite".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

fn default_frontend_url() -> Url {
    Url::parse("http://localhost:5173").expect("static url")
}

fn default_oauth_redirect_url() -> Url {
    Url::parse("http://localhost:8000/auth/callback").expect("static url")
}

fn default_jwt_secret() -> String {
    "insecure-dev-secret".to_string()
}

fn default_jwt_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_max_page_size() -> u32 {
    100
}

fn default_rate_limit_rps() -> u32 {
    50
}

impl Config {
    /// True while the JWT secret is still the built-in development default.
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }
}
