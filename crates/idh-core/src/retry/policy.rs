use std::time::Duration;

/// High-level classification of an error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (429), optionally with a `Retry-After` hint in seconds.
    RateLimited { retry_after: Option<u64> },
    /// Any other error (timeouts, connection failures, other statuses). Never retried.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retryable, but the retry budget is spent.
    Exhausted,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff without jitter or cap; the retry count bounds it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

impl BackoffPolicy {
    pub fn new(initial_delay: Duration) -> Self {
        Self { initial_delay }
    }

    /// Delay before the next attempt.
    ///
    /// `attempt` is the number of retries already made (0 before the first retry).
    /// A server hint (`Retry-After` seconds) wins over the exponential schedule.
    pub fn next_delay(&self, attempt: u32, hint: Option<u64>) -> Duration {
        match hint {
            Some(secs) => Duration::from_millis(secs.saturating_mul(1000)),
            None => {
                let factor = 1u128.checked_shl(attempt).unwrap_or(u128::MAX);
                let nanos = self.initial_delay.as_nanos().saturating_mul(factor);
                duration_from_nanos(nanos)
            }
        }
    }
}

/// `Duration` from a nanosecond count, clamped to `Duration::MAX`.
fn duration_from_nanos(nanos: u128) -> Duration {
    const NANOS_PER_SEC: u128 = 1_000_000_000;
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}

/// Retry budget plus backoff schedule, shared by every request of a run.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after a failed attempt.
    ///
    /// `attempt` is 0-based: the number of retries already made for this request.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::RateLimited { .. } if attempt >= self.max_retries => {
                RetryDecision::Exhausted
            }
            ErrorKind::RateLimited { retry_after } => {
                RetryDecision::RetryAfter(self.backoff.next_delay(attempt, retry_after))
            }
        }
    }
}

/// Parse a `Retry-After` header value as integer seconds.
/// HTTP-date forms and garbage are treated as absent.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
