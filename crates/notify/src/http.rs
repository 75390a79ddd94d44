use brigade_core::AuthConfig;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::NotifyError;
use crate::retry::RetryPolicy;

/// Apply outbound authentication to a request. Blank credentials are
/// ignored.
pub fn apply_auth(
    request: reqwest::RequestBuilder,
    auth: Option<&AuthConfig>,
) -> reqwest::RequestBuilder {
    match auth {
        Some(AuthConfig::Bearer { token }) if !token.is_empty() => request.bearer_auth(token),
        Some(AuthConfig::ApiKey { header, key }) if !header.is_empty() && !key.is_empty() => {
            request.header(header.as_str(), key.as_str())
        }
        Some(AuthConfig::Basic { username, password }) if !username.is_empty() => {
            request.basic_auth(username, Some(password))
        }
        _ => request,
    }
}

/// Send a request under `policy`, rebuilding it for every attempt.
///
/// Any 2xx response is success. Transport errors and other statuses are
/// retried; when attempts run out the error names the last failure. A
/// request that cannot be built fails on the first attempt.
pub async fn send_with_retries<F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    what: &'static str,
    url: &str,
    build: F,
) -> Result<(), NotifyError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let build = &build;
    policy
        .run(what, cancel, move |attempt| async move {
            debug!(attempt, url, "sending {what}");
            let response = build().send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(NotifyError::HttpStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                })
            }
        })
        .await
}
