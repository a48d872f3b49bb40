//! Remote identity API: response model, record mapping, and the HTTP client.

mod client;
mod headers;
mod record;

pub use client::{CurlIdentityClient, IdentitySource};
pub use headers::ResponseHeaders;
pub use record::{ApiEnvelope, BankInfo, CreditCardInfo, IdentityPayload, Record, HEADER};
