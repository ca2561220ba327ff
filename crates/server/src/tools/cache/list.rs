//! cache_partitions tool implementation.
//!
//! Lists partitions in creation order with their entry counts.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_core::CacheDb;
use tether_core::cache::PartitionInfo;

use crate::tools::json_result;

/// Output from the cache_partitions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePartitionsOutput {
    pub partitions: Vec<PartitionInfo>,
}

/// Implementation of the cache_partitions tool.
pub async fn list_impl(cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let partitions = cache.partition_info().await?;
    json_result(&CachePartitionsOutput { partitions })
}
