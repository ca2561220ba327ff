//! cache_get tool implementation.
//!
//! Looks up the cached response for a GET request.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_client::OfflineWorker;
use tether_client::fetch::resolve;
use tether_core::{Error, Request};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, absolute or relative to the configured origin.
    pub url: String,

    /// Only search this partition (default: all, in creation order).
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub stored_at: String,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &OfflineWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&worker.settings().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);

    let order = worker.settings().lookup_order();
    let stored = match params.partition.as_deref() {
        Some(name) => worker.cache().match_request(&request, Some(&[name][..])).await?,
        None => {
            let order: Vec<&str> = order.iter().map(String::as_str).collect();
            worker.cache().match_preferring(&request, &order).await?
        }
    }
    .ok_or_else(|| Error::CacheMiss(request.cache_url()))?;

    let output = CacheGetOutput {
        url: stored.url,
        status: stored.status,
        content_type: stored.content_type,
        stored_at: stored.stored_at,
        body: String::from_utf8_lossy(&stored.body).into_owned(),
        body_bytes: stored.body.len(),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{mock_precache, output, worker};
    use httpmock::MockServer;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let server = MockServer::start_async().await;
        let (worker, _) = worker(&server).await;

        let params = CacheGetParams { url: "/nothing.css".into(), partition: None };
        assert!(get_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let server = MockServer::start_async().await;
        mock_precache(&server, "<html>shell</html>").await;
        let (worker, _) = worker(&server).await;
        worker.on_install().await.unwrap();

        let params = CacheGetParams { url: "/index.html".into(), partition: Some("static-cache-v1".into()) };
        let out: CacheGetOutput = output(&get_impl(&worker, params).await.unwrap());

        assert_eq!(out.status, 200);
        assert_eq!(out.body, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_get_impl_other_partition_misses() {
        let server = MockServer::start_async().await;
        mock_precache(&server, "<html>shell</html>").await;
        let (worker, _) = worker(&server).await;
        worker.on_install().await.unwrap();

        let params = CacheGetParams { url: "/index.html".into(), partition: Some("dynamic-cache-v1".into()) };
        assert!(get_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_prefers_dynamic_copy() {
        let server = MockServer::start_async().await;
        mock_precache(&server, "<html>shell</html>").await;
        let (worker, _) = worker(&server).await;
        worker.on_install().await.unwrap();

        let request = Request::get(worker.settings().shell.clone());
        let latest = tether_core::StoredResponse::new(request.cache_url(), 200, None, vec![], b"<html>v2</html>".to_vec());
        worker.cache().open_partition("dynamic-cache-v1").await.unwrap().put(&request, &latest).await.unwrap();

        let params = CacheGetParams { url: "/index.html".into(), partition: None };
        let out: CacheGetOutput = output(&get_impl(&worker, params).await.unwrap());

        assert_eq!(out.body, "<html>v2</html>");
    }
}
