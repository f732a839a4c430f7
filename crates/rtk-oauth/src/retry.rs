//! Retry with exponential backoff (§4.D), shaped after this workspace's
//! general connection-retry idiom.

use std::future::Future;
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Either the refresh HTTP call failed in a way the classification layer
/// could not further interpret (retryable), or it completed and was
/// classified into a user-visible [`rtk_error::RtkError`] (not
/// retryable — see §4.D, "retry only on I/O errors and timeouts, not on
/// HTTP-level classified errors").
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// A transport-level failure: connection refused, DNS failure, send
    /// timeout, or similar. Eligible for retry.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// A response was received and classified into a final error. Not
    /// retried.
    #[error("{0}")]
    Classified(#[source] rtk_error::RtkError),
}

/// Retry configuration (§4.D): up to 3 attempts total, 1s initial delay,
/// exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts after the initial one. `2` means 3 total
    /// attempts, matching §4.D.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
    /// Cap on any single backoff delay.
    #[serde(with = "duration_millis")]
    pub max_delay: Duration,
    /// Jitter factor in `[0.0, 1.0]`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            jitter_factor: 0.2,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(val: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        val.as_millis().serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let ms: u64 = u64::deserialize(de)?;
        Ok(Duration::from_millis(ms))
    }
}

/// Record of a single failed attempt, retained for diagnostics.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// Zero-indexed attempt number.
    pub attempt: u32,
    /// Error message from this attempt.
    pub error: String,
    /// Backoff delay applied before the next attempt.
    pub delay: Duration,
}

/// Metadata captured across all attempts of one refresh.
#[derive(Debug, Clone, Default)]
pub struct RetryMetadata {
    /// Total number of attempts made (including the successful one, if
    /// any).
    pub total_attempts: u32,
    /// Records of each failed attempt.
    pub failed_attempts: Vec<RetryAttempt>,
}

/// Computes the backoff delay for a zero-indexed attempt number.
#[must_use]
pub fn compute_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let delay_ms = (config.base_delay.as_millis() as u64).saturating_mul(exp);
    let capped_ms = delay_ms.min(config.max_delay.as_millis() as u64);

    let jitter_factor = config.jitter_factor.clamp(0.0, 1.0);
    if jitter_factor > 0.0 && capped_ms > 0 {
        let jitter_range = (capped_ms as f64 * jitter_factor) as u64;
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as u64;
        let pseudo = nanos.wrapping_mul(attempt as u64 + 1);
        let jitter = if jitter_range > 0 { pseudo % jitter_range } else { 0 };
        Duration::from_millis(capped_ms.saturating_sub(jitter))
    } else {
        Duration::from_millis(capped_ms)
    }
}

/// `true` if `err` should trigger a retry: only transport-level
/// failures are retried, never a classified OAuth/HTTP error.
#[must_use]
pub fn is_retryable(err: &RefreshError) -> bool {
    matches!(err, RefreshError::Transport(_))
}

/// Runs `op` up to `config.max_retries + 1` times with exponential
/// backoff, stopping immediately on a [`RefreshError::Classified`]
/// failure.
pub async fn retry_async<T, F, Fut>(config: &RetryConfig, mut op: F) -> (Result<T, RefreshError>, RetryMetadata)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RefreshError>>,
{
    let start = Instant::now();
    let max_attempts = config.max_retries + 1;
    let mut failed_attempts = Vec::new();

    for attempt in 0..max_attempts {
        debug!(target: "rtk.oauth.retry", attempt, max_attempts, "attempting token refresh");

        match op().await {
            Ok(value) => {
                debug!(
                    target: "rtk.oauth.retry",
                    attempt,
                    total_duration_ms = start.elapsed().as_millis() as u64,
                    "token refresh succeeded"
                );
                return (
                    Ok(value),
                    RetryMetadata { total_attempts: attempt + 1, failed_attempts },
                );
            }
            Err(err) => {
                let is_last = attempt + 1 >= max_attempts;

                if !is_retryable(&err) {
                    debug!(target: "rtk.oauth.retry", error = %err, "non-retryable error, giving up");
                    return (
                        Err(err),
                        RetryMetadata { total_attempts: attempt + 1, failed_attempts },
                    );
                }

                if is_last {
                    warn!(target: "rtk.oauth.retry", error = %err, attempt, "max retries exhausted");
                    failed_attempts.push(RetryAttempt { attempt, error: err.to_string(), delay: Duration::ZERO });
                    return (
                        Err(err),
                        RetryMetadata { total_attempts: attempt + 1, failed_attempts },
                    );
                }

                let delay = compute_delay(config, attempt);
                warn!(
                    target: "rtk.oauth.retry",
                    error = %err,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retryable error, backing off"
                );
                failed_attempts.push(RetryAttempt { attempt, error: err.to_string(), delay });
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("loop always returns on its last iteration")
}
