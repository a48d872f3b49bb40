//! Retry and backoff policy.
//!
//! Only rate limiting (HTTP 429) is retried; every other failure is terminal
//! for its request index. `RetryingFetcher` turns the attempts for one index
//! into a single `FetchOutcome`.

mod classify;
mod error;
mod policy;
mod run;

#[cfg(test)]
pub(crate) use run::testing;

pub use classify::{classify, classify_http_status};
pub use error::FetchError;
pub use policy::{parse_retry_after, BackoffPolicy, ErrorKind, RetryDecision, RetryPolicy};
pub use run::{FetchOutcome, RetryingFetcher, MAX_RETRIES_REACHED};
