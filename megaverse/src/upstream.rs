use crate::errors::TransportError;
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use hyper::ext::ReasonPhrase;
use std::time::Duration;
use url::Url;

/// A fully built request to the map API. Retries resend the same value.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub reason: String,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode) -> Self {
        UpstreamResponse::with_reason(status, None)
    }

    /// Prefers the reason phrase sent by the server, then the canonical one,
    /// then the numeric code. The reason is never empty.
    pub fn with_reason(status: StatusCode, reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .or(status.canonical_reason())
            .unwrap_or(status.as_str())
            .to_string();

        UpstreamResponse { status, reason }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }
}

/// Performs exactly one outbound call. Implementations never retry and never
/// look at the response body.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// `Upstream` backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpUpstream { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .json(&request.body)
            .send()
            .await?;

        // Only present when the phrase differs from the canonical one
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok());

        Ok(UpstreamResponse::with_reason(response.status(), reason))
    }
}
