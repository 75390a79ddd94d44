use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Dispatch settings, loaded from the `[notify]` table of `brigade.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Timeout applied to every outbound request, in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Attempts per target, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff increment between attempts, in seconds.
    #[serde(default = "default_backoff_step_seconds")]
    pub backoff_step_seconds: u64,

    /// Cap on targets delivered to at once by a fan-out. Unbounded if unset.
    #[serde(default)]
    pub max_concurrent_targets: Option<usize>,
}

fn default_request_timeout_seconds() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step_seconds() -> u64 {
    2
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout_seconds(),
            max_attempts: default_max_attempts(),
            backoff_step_seconds: default_backoff_step_seconds(),
            max_concurrent_targets: None,
        }
    }
}

impl NotifyConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.backoff_step_seconds),
        )
    }
}
