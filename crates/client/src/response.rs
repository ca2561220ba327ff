//! Responses produced by the strategies.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tether_core::{Error, StoredResponse};

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

/// A response handed back to the page.
#[derive(Debug, Clone)]
pub struct Response {
    /// The URL the response belongs to (final URL for network responses)
    pub url: String,
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// Build a response with a single content-type header.
    pub fn with_body(
        url: impl Into<String>, status: StatusCode, content_type: &'static str, body: impl Into<Bytes>,
        source: ResponseSource,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self { url: url.into(), status, headers, body: body.into(), source }
    }

    /// Rebuild a response from a cache snapshot.
    ///
    /// Headers that are no longer valid header names/values are dropped.
    pub fn from_stored(stored: StoredResponse, source: ResponseSource) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }
        if !headers.contains_key(header::CONTENT_TYPE)
            && let Some(ct) = stored.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok())
        {
            headers.insert(header::CONTENT_TYPE, ct);
        }

        let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
        Self { url: stored.url, status, headers, body: Bytes::from(stored.body), source }
    }

    /// Snapshot this response for storage.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse::new(
            self.url.clone(),
            self.status.as_u16(),
            self.content_type().map(str::to_string),
            headers,
            self.body.to_vec(),
        )
    }

    /// Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body decoded as UTF-8 text.
    pub fn text(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.body).map_err(|e| Error::InvalidInput(format!("{} is not text: {e}", self.url)))
    }
}
