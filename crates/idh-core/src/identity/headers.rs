//! Parse HTTP response header lines collected by curl.

use crate::retry::parse_retry_after;

/// Headers of the last response that matter to the fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// `Retry-After` in whole seconds, when present and numeric.
    pub retry_after: Option<u64>,
}

/// Parse collected header lines. Curl reports the headers of every response
/// (redirects, `100 Continue`); a status line resets what was seen so far.
pub(crate) fn parse_headers(lines: &[String]) -> ResponseHeaders {
    let mut out = ResponseHeaders::default();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            out = ResponseHeaders::default();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("retry-after") {
                out.retry_after = parse_retry_after(value);
            }
        }
    }
    out
}
