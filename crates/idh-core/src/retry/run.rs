//! Retry loop: one logical identity fetch, retried only on rate limiting.

use crate::identity::{ApiEnvelope, IdentitySource};

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};

/// Result of all attempts for one request index.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(ApiEnvelope),
    Failure(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

pub const MAX_RETRIES_REACHED: &str = "max retries reached";

/// Wraps an `IdentitySource` with the run's retry policy.
pub struct RetryingFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: IdentitySource> RetryingFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch one identity for `index` (0-based). Never fails: terminal errors
    /// become `FetchOutcome::Failure`. Sleeps between 429 retries.
    pub async fn fetch(&self, index: u64) -> FetchOutcome {
        let request = index + 1;
        let mut attempt = 0u32;
        loop {
            let err = match self.source.fetch_identity().await {
                Ok(envelope) => {
                    tracing::info!(request, attempt, "request {} completed", request);
                    return FetchOutcome::Success(envelope);
                }
                Err(e) => e,
            };

            match self.policy.decide(attempt, classify::classify(&err)) {
                RetryDecision::RetryAfter(delay) => {
                    attempt += 1;
                    tracing::warn!(
                        request,
                        "request {} received 429, retrying after {} ms (retry {}/{})",
                        request,
                        delay.as_millis(),
                        attempt,
                        self.policy.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    tracing::error!(
                        request,
                        "request {} failed after {} retries",
                        request,
                        self.policy.max_retries
                    );
                    return FetchOutcome::Failure(MAX_RETRIES_REACHED.to_string());
                }
                RetryDecision::NoRetry => {
                    tracing::error!(request, "error during request {}: {}", request, err);
                    return FetchOutcome::Failure(err.to_string());
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedSource, Step};
    use super::*;
    use crate::retry::BackoffPolicy;
    use std::time::Duration;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: BackoffPolicy::new(Duration::from_millis(1000)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let fetcher = RetryingFetcher::new(ScriptedSource::always_ok(), policy(5));
        let start = tokio::time::Instant::now();
        assert!(fetcher.fetch(0).await.is_success());
        assert_eq!(fetcher.source().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_r_rate_limits() {
        let script = vec![
            Step::RateLimited(None),
            Step::RateLimited(None),
            Step::RateLimited(None),
        ];
        let fetcher = RetryingFetcher::new(ScriptedSource::new(script), policy(5));
        let start = tokio::time::Instant::now();
        let outcome = fetcher.fetch(3).await;
        assert!(outcome.is_success());
        assert_eq!(fetcher.source().calls(), 4);
        // 1s + 2s + 4s of exponential backoff.
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_limit_gives_up_after_max_retries() {
        let script = (0..10).map(|_| Step::RateLimited(None)).collect();
        let fetcher = RetryingFetcher::new(ScriptedSource::new(script), policy(5));
        match fetcher.fetch(0).await {
            FetchOutcome::Failure(reason) => assert_eq!(reason, MAX_RETRIES_REACHED),
            FetchOutcome::Success(_) => panic!("expected failure"),
        }
        assert_eq!(fetcher.source().calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_hint_sets_delay() {
        let script = vec![Step::RateLimited(Some(3)), Step::RateLimited(Some(3))];
        let fetcher = RetryingFetcher::new(ScriptedSource::new(script), policy(5));
        let start = tokio::time::Instant::now();
        assert!(fetcher.fetch(0).await.is_success());
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn non_429_error_is_terminal_without_sleep() {
        let fetcher = RetryingFetcher::new(ScriptedSource::new(vec![Step::Http(500)]), policy(5));
        let start = tokio::time::Instant::now();
        match fetcher.fetch(0).await {
            FetchOutcome::Failure(reason) => assert_eq!(reason, "HTTP 500"),
            FetchOutcome::Success(_) => panic!("expected failure"),
        }
        assert_eq!(fetcher.source().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let fetcher =
            RetryingFetcher::new(ScriptedSource::new(vec![Step::RateLimited(Some(1))]), policy(0));
        assert!(!fetcher.fetch(0).await.is_success());
        assert_eq!(fetcher.source().calls(), 1);
    }
}
