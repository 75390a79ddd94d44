use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::NotifyError;

/// Bounded retry with linear backoff.
///
/// Before attempt `n` (1-based, `n >= 2`) the policy waits
/// `backoff_step * (n - 1)`: with the defaults that is 2s before the second
/// attempt and 4s before the third.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Linear backoff increment.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts,
            backoff_step,
        }
    }

    /// Delay to wait before the given 1-based attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt.saturating_sub(1)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number. Cancellation interrupts both
    /// the backoff sleep and the in-flight attempt. A failure that is not
    /// [retryable](NotifyError::is_retryable) is returned as is. When every
    /// attempt fails the result is [`NotifyError::Exhausted`] wrapping the
    /// last failure; `what` names the operation in that message.
    pub async fn run<T, F, Fut>(
        &self,
        what: &'static str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, NotifyError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, NotifyError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(NotifyError::Cancelled),
                    () = tokio::time::sleep(self.delay_before(attempt)) => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(NotifyError::Cancelled),
                outcome = op(attempt) => outcome,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    warn!(attempt, error = %err, "{what} attempt failed, not retrying");
                    return Err(err);
                }
                Err(err) if attempt >= attempts => {
                    return Err(NotifyError::Exhausted {
                        what,
                        attempts,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "{what} attempt failed, retrying");
                }
            }
            attempt += 1;
        }
    }
}
