//! Classify HTTP status and fetch errors into retry policy error kinds.

use crate::retry::error::FetchError;
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code. Only 429 is retryable; the `Retry-After`
/// hint is attached by the caller when it has the response headers.
pub fn classify_http_status(code: u32, retry_after: Option<u64>) -> ErrorKind {
    match code {
        429 => ErrorKind::RateLimited { retry_after },
        _ => ErrorKind::Other,
    }
}

/// Classify a fetch error. Timeouts and connection failures are terminal.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::RateLimited { retry_after } => classify_http_status(429, *retry_after),
        FetchError::Http(code) => classify_http_status(*code, None),
        FetchError::Transport(_) | FetchError::Decode(_) | FetchError::Worker(_) => {
            ErrorKind::Other
        }
    }
}
