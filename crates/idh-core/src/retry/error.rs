//! Per-attempt fetch error, classified before it becomes an outcome.

/// Error returned by a single identity request (one HTTP attempt).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Server answered 429; `retry_after` is the parsed `Retry-After` seconds, if usable.
    #[error("HTTP 429 Too Many Requests")]
    RateLimited { retry_after: Option<u64> },
    /// Any other non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Curl reported an error (timeout, connection, TLS, etc.).
    #[error("{0}")]
    Transport(#[from] curl::Error),
    /// Body was not the expected JSON envelope.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// The blocking request task panicked or was cancelled.
    #[error("request task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
