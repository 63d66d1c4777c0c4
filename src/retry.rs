//! Retry with exponential backoff for bulk publish requests.
//!
//! The wait before retry `n` (1-based) is `initial_delay * factor^(n-1)`,
//! capped at `max_delay`. With the defaults that is 5s, 10s, 20s, 40s, 64s.
//! Every error is treated as transient: the publish endpoint gives no reliable
//! signal to tell a throttled request from a rejected one.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

/// How often and how patiently a failed batch is retried.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a batch gets `max_retries + 1` attempts.
    pub max_retries: u32,
    pub factor: f64,
    #[serde(rename = "initial_delay_secs", with = "secs")]
    pub initial_delay: Duration,
    #[serde(rename = "max_delay_secs", with = "secs")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            factor: 2.0,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(64),
        }
    }
}

impl RetryPolicy {
    /// Wait before the given retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// Run `operation` until it succeeds or the policy's retries are spent.
///
/// Returns the first success, or the last error once `max_retries` retries
/// have failed as well. Each retry is logged at warn level with `label`, its
/// number, the wait before it and the error that triggered it.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    tracing::info!(
                        operation = label,
                        attempts = retry + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) if retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_for(retry);
                tracing::warn!(
                    operation = label,
                    attempt = retry,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying operation"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::error!(
                    operation = label,
                    error = %e,
                    attempts = retry + 1,
                    "Operation failed after all retry attempts exhausted"
                );
                return Err(e);
            }
        }
    }
}
