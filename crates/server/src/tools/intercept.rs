//! intercept tool implementation.
//!
//! Hands a page request to the worker and reports how it was answered.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_client::fetch::resolve;
use tether_client::{Intercept, OfflineWorker, ResponseSource};
use tether_core::{Error, Request, RequestClassification, RequestMode};

use super::json_result;

/// Parameters for the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptParams {
    /// Request URL, absolute or relative to the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Whether this is a top-level navigation.
    #[serde(default)]
    pub navigate: bool,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the intercept tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InterceptOutput {
    /// The resolved request URL.
    pub url: String,
    pub classification: RequestClassification,
    /// `pass_through` when the host should fetch the request itself.
    pub action: String,
    pub status: Option<u16>,
    pub source: Option<ResponseSource>,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
    pub body_bytes: Option<usize>,
}

/// Implementation of the intercept tool.
pub async fn intercept_impl(worker: &OfflineWorker, params: InterceptParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.settings().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::Subresource };
    let request = Request::new(&params.method, url, mode);
    let classification = worker.classify(&request);

    let output = match worker.on_intercept(&request).await? {
        Intercept::PassThrough => InterceptOutput {
            url: request.cache_url(),
            classification,
            action: "pass_through".into(),
            status: None,
            source: None,
            content_type: None,
            body: None,
            body_bytes: None,
        },
        Intercept::Respond(response) => InterceptOutput {
            url: request.cache_url(),
            classification,
            action: "respond".into(),
            status: Some(response.status.as_u16()),
            source: Some(response.source),
            content_type: response.content_type().map(str::to_string),
            body: Some(String::from_utf8_lossy(&response.body).into_owned()),
            body_bytes: Some(response.body.len()),
        },
    };

    json_result(&output)
}
