use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded Exponential Backoff
// ============================================================================
//
// Replays short storage operations whose failures are expected to be
// transient. Only the audit append goes through this; the conditional status
// write is never retried, because a lost race needs a fresh read and a new
// decision, not a replay.
//
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Total tries, counting the first.
    pub attempts: u32,
    /// Delay before the second try; doubles after every failure.
    pub first_delay: Duration,
    /// Ceiling on the doubling.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// Tuned for the audit append: one quick replay, so a committed
    /// transition is never held up for long by a flaky event insert.
    pub const fn conservative() -> Self {
        Self {
            attempts: 2,
            first_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent,
/// sleeping with doubling delays in between. The operation receives the
/// 1-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E>(config: RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.first_delay;

    for attempt in 1.. {
        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if attempt < config.attempts => {
                tracing::warn!(
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying after delay"
                );
                sleep(delay).await;
                delay = (delay * 2).min(config.max_delay);
            }
            Err(error) => {
                tracing::error!(attempt, error = %error, "Operation failed after all retries");
                return Err(error);
            }
        }
    }

    unreachable!("retry loop returns from within")
}
