use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often and how patiently to retry a failing fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total runs = 1 + max_retries)
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Constant delay between attempts.
    pub fn fixed(max_retries: usize, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            backoff_factor: 1.0,
            max_delay: delay,
        }
    }

    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (0-based), capped at `max_delay`.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let factor = self.backoff_factor.max(1.0).powi(retry.min(i32::MAX as usize) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Retries an async operation according to `policy`.
///
/// Errors for which `is_retryable` returns false end the loop immediately.
/// On failure the last error is returned along with the number of attempts
/// made.
pub async fn with_retry<F, Fut, T, E, R>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: R,
) -> Result<T, (E, usize)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt >= policy.attempts() || !is_retryable(&err) {
                    return Err((err, attempt));
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt,
                    policy.attempts(),
                    err,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
