//! Retry-with-backoff for the client connector's reconnect loop (spec
//! §4.7).
//!
//! Grounded on `turbomcp-transport/src/http_sse_client.rs`'s
//! `sse_connection_task`: a bounded (or unbounded, if `max_attempts == 0`)
//! reconnect loop with a fixed delay between attempts. This runtime adds
//! exponential backoff with jitter, matching the pattern described in
//! `turbomcp-client/src/client/dispatcher.rs`'s routing task ("exponential
//! backoff on consecutive errors").

use std::time::Duration;

/// Exponential backoff with full jitter, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// `0` means retry forever.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    /// The spec's default delay formula: `min(50ms × 2^attempt, 1000ms)`.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(1000),
            max_attempts: 0,
        }
    }
}

impl BackoffPolicy {
    /// Whether a reconnect attempt numbered `attempt` (1-based) is still
    /// permitted.
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }

    /// The delay to wait before attempt number `attempt` (1-based),
    /// doubling each attempt and capped at `max_delay`, with up to 50%
    /// random jitter to avoid synchronized reconnect storms.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let doubled = self.base_delay.saturating_mul(1u32.checked_shl(exp).unwrap_or(u32::MAX));
        let capped = doubled.min(self.max_delay);
        let jitter_frac: f64 = rand::random::<f64>() * 0.5;
        capped.mul_f64(1.0 - jitter_frac)
    }
}

/// Drives a fallible async operation through [`BackoffPolicy`], calling
/// `on_retry` between attempts so callers can log. Returns the first `Ok`,
/// or the last `Err` once attempts are exhausted. Every error is treated as
/// retryable; use [`retry_with_backoff_classify`] to short-circuit on a
/// non-retryable error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &BackoffPolicy,
    op: F,
    on_retry: impl FnMut(u32, &E),
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    retry_with_backoff_classify(policy, op, on_retry, |_| false).await
}

/// Like [`retry_with_backoff`], but stops immediately the first time
/// `is_non_retryable` reports `true` for an error, regardless of how many
/// attempts `policy.max_attempts` still permits. Matches the spec's default
/// `shouldRetry`: "error is not NonRetryable".
pub async fn retry_with_backoff_classify<T, E, F, Fut>(
    policy: &BackoffPolicy,
    mut op: F,
    mut on_retry: impl FnMut(u32, &E),
    is_non_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if is_non_retryable(&e) || !policy.should_retry(attempt) {
                    return Err(e);
                }
                on_retry(attempt, &e);
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}
