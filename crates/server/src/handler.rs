//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker. It is the top-level error boundary: failed tool calls are logged
//! here and returned to the host as error responses.
use std::sync::Arc;

use crate::tools::{
    InterceptParams, PostMessageParams,
    cache::{CacheGetParams, get_impl, list_impl},
    intercept::intercept_impl,
    lifecycle::{activate_impl, check_updates_impl, install_impl},
    message::post_message_impl,
    notifications::notifications_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tether_client::{OfflineWorker, QueueNotifier};

/// The main MCP server handler for the tether worker.
#[derive(Clone)]
pub struct TetherServer {
    worker: Arc<OfflineWorker>,
    notifier: Arc<QueueNotifier>,
    tool_router: ToolRouter<Self>,
}

fn logged(tool: &str, result: Result<CallToolResult, McpError>) -> Result<CallToolResult, McpError> {
    if let Err(e) = &result {
        tracing::error!(tool, code = e.code.0, "tool call failed: {}", e.message);
    }
    result
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TetherServer {
    /// Create a new server handler.
    pub fn new(worker: Arc<OfflineWorker>, notifier: Arc<QueueNotifier>) -> Self {
        Self { worker, notifier, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Intercept a page request. Classifies it and answers from network, cache or offline fallback, or reports pass_through."
    )]
    async fn intercept(&self, params: Parameters<InterceptParams>) -> Result<CallToolResult, McpError> {
        logged("intercept", intercept_impl(&self.worker, params.0).await)
    }

    #[tool(description = "Run the install lifecycle event: pre-cache the app shell into the static partition.")]
    async fn install(&self) -> Result<CallToolResult, McpError> {
        logged("install", install_impl(&self.worker).await)
    }

    #[tool(description = "Run the activate lifecycle event: delete every partition except the current static and dynamic ones.")]
    async fn activate(&self) -> Result<CallToolResult, McpError> {
        logged("activate", activate_impl(&self.worker).await)
    }

    #[tool(description = "Post a control message to the worker. Supported types: SKIP_WAITING, CACHE_DATA.")]
    async fn post_message(&self, params: Parameters<PostMessageParams>) -> Result<CallToolResult, McpError> {
        logged("post_message", post_message_impl(&self.worker, params.0).await)
    }

    #[tool(description = "Check whether a new version of the app has been deployed.")]
    async fn check_updates(&self) -> Result<CallToolResult, McpError> {
        logged("check_updates", check_updates_impl(&self.worker).await)
    }

    #[tool(description = "Collect pending user-visible notifications.")]
    async fn notifications(&self) -> Result<CallToolResult, McpError> {
        logged("notifications", notifications_impl(&self.notifier).await)
    }

    #[tool(description = "List cache partitions in creation order with entry counts.")]
    async fn cache_partitions(&self) -> Result<CallToolResult, McpError> {
        logged("cache_partitions", list_impl(self.worker.cache()).await)
    }

    #[tool(description = "Look up the cached response for a URL, optionally within one partition.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        logged("cache_get", get_impl(&self.worker, params.0).await)
    }
}

impl ServerHandler for TetherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tether-worker".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::worker;
    use httpmock::MockServer;

    #[tokio::test]
    async fn test_all_tools_listed() {
        let server = MockServer::start_async().await;
        let (worker, notifier) = worker(&server).await;
        let handler = TetherServer::new(worker, notifier);

        let mut names: Vec<String> = handler.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            [
                "activate",
                "cache_get",
                "cache_partitions",
                "check_updates",
                "install",
                "intercept",
                "notifications",
                "post_message"
            ]
        );
    }

    #[test]
    fn test_logged_passes_result_through() {
        let err = McpError::invalid_params("bad", None);
        assert!(logged("intercept", Err(err)).is_err());
    }
}
