//! post_message tool implementation.
//!
//! Delivers a control message from the page to the worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_client::{Lifecycle, OfflineWorker};
use tether_core::ControlMessage;

use super::json_result;

/// Parameters for the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// Message object with a `type` field (`SKIP_WAITING` or `CACHE_DATA`).
    pub message: serde_json::Value,
}

/// Output from the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageOutput {
    /// False when the message type was not recognized.
    pub accepted: bool,
    pub lifecycle: Lifecycle,
}

/// Implementation of the post_message tool.
///
/// Unknown message types are ignored rather than rejected.
pub async fn post_message_impl(worker: &OfflineWorker, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let accepted = match ControlMessage::parse(params.message) {
        Some(message) => {
            worker.on_message(message).await?;
            true
        }
        None => false,
    };

    json_result(&PostMessageOutput { accepted, lifecycle: worker.lifecycle().await })
}
