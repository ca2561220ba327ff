//! MCP tool implementations.
//!
//! This module contains all tools exposed by the tether worker.

pub mod cache;
pub mod intercept;
pub mod lifecycle;
pub mod message;
pub mod notifications;

pub use intercept::InterceptParams;
pub use message::PostMessageParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use tether_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
