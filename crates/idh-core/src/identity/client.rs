//! Identity API client: one GET per call, libcurl on the blocking pool.

use std::future::Future;
use std::str;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::retry::FetchError;

use super::headers::parse_headers;
use super::record::ApiEnvelope;

/// Source of identity envelopes. One call is one HTTP attempt; retries live in
/// `RetryingFetcher`.
pub trait IdentitySource: Send + Sync {
    fn fetch_identity(&self) -> impl Future<Output = Result<ApiEnvelope, FetchError>> + Send;
}

impl<S: IdentitySource> IdentitySource for Arc<S> {
    fn fetch_identity(&self) -> impl Future<Output = Result<ApiEnvelope, FetchError>> + Send {
        (**self).fetch_identity()
    }
}

/// Request settings captured once so each attempt can move a copy into `spawn_blocking`.
struct RequestSpec {
    url: String,
    client_id: String,
    secret: String,
    timeout: Duration,
}

/// Curl-backed `IdentitySource` for `GET <base>/api/identity/<country>` with basic auth.
#[derive(Clone)]
pub struct CurlIdentityClient {
    spec: Arc<RequestSpec>,
}

impl CurlIdentityClient {
    pub fn new(api: &ApiConfig) -> anyhow::Result<Self> {
        let url = api.endpoint()?;
        Ok(Self {
            spec: Arc::new(RequestSpec {
                url: url.to_string(),
                client_id: api.client_id.clone(),
                secret: api.secret.clone(),
                timeout: api.timeout(),
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.spec.url
    }
}

impl IdentitySource for CurlIdentityClient {
    fn fetch_identity(&self) -> impl Future<Output = Result<ApiEnvelope, FetchError>> + Send {
        let spec = Arc::clone(&self.spec);
        async move { tokio::task::spawn_blocking(move || get_identity(&spec)).await? }
    }
}

/// Performs the GET in the current thread and decodes the envelope.
fn get_identity(spec: &RequestSpec) -> Result<ApiEnvelope, FetchError> {
    let mut headers: Vec<String> = Vec::new();
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(&spec.url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(5)?;
    easy.connect_timeout(spec.timeout)?;
    easy.timeout(spec.timeout)?;
    if !spec.client_id.is_empty() {
        let mut auth = curl::easy::Auth::new();
        auth.basic(true);
        easy.http_auth(&auth)?;
        easy.username(&spec.client_id)?;
        easy.password(&spec.secret)?;
    }

    let mut list = curl::easy::List::new();
    list.append("Accept: application/json")?;
    easy.http_headers(list)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if code == 429 {
        let parsed = parse_headers(&headers);
        return Err(FetchError::RateLimited {
            retry_after: parsed.retry_after,
        });
    }
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(serde_json::from_slice(&body)?)
}
