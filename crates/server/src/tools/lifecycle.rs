//! Lifecycle tools: install, activate, check_updates.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_client::{Lifecycle, OfflineWorker};
use tether_core::UpdateResult;

use super::json_result;

/// Output from the install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    pub lifecycle: Lifecycle,
    /// Number of assets written to the static partition.
    pub cached: usize,
}

/// Output from the activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub lifecycle: Lifecycle,
    /// Partitions removed by the sweep.
    pub deleted: Vec<String>,
}

/// Output from the check_updates tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CheckUpdatesOutput {
    pub result: UpdateResult,
    /// The canonical resource that was compared.
    pub url: String,
}

/// Implementation of the install tool.
pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let cached = worker.on_install().await?;
    json_result(&InstallOutput { lifecycle: worker.lifecycle().await, cached })
}

/// Implementation of the activate tool.
pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await;
    json_result(&ActivateOutput { lifecycle: worker.lifecycle().await, deleted: report.deleted })
}

/// Implementation of the check_updates tool.
pub async fn check_updates_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let result = worker.on_periodic_trigger().await;
    json_result(&CheckUpdatesOutput { result, url: worker.settings().version_check.to_string() })
}
