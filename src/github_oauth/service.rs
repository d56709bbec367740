use super::endpoints::{GithubOauthEndpoints, GithubUser};
use crate::error::LensError;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Service layer composing the GitHub OAuth operations used by the
/// callback handler.
pub struct GithubOauthService;

impl GithubOauthService {
    /// Fetch the token owner's identity with network-aware retries.
    /// The token exchange itself is never retried: authorization codes are
    /// single-use.
    pub async fn fetch_user_with_retry(
        access_token: impl AsRef<str>,
        http_client: reqwest::Client,
    ) -> Result<GithubUser, LensError> {
        let retry_policy = default_retry_policy();

        (|| async {
            GithubOauthEndpoints::fetch_authenticated_user(
                access_token.as_ref(),
                http_client.clone(),
            )
            .await
        })
        .retry(retry_policy)
        .when(|e: &LensError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("GitHub user fetch retrying after error {}, sleeping {:?}", err, dur);
        })
        .await
    }
}
