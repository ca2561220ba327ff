//! notifications tool implementation.
//!
//! Hands queued notifications to the host for display.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tether_client::{Notification, QueueNotifier};

use super::json_result;

/// Output from the notifications tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationsOutput {
    pub notifications: Vec<Notification>,
}

/// Implementation of the notifications tool. Drains the queue.
pub async fn notifications_impl(notifier: &QueueNotifier) -> Result<CallToolResult, McpError> {
    let notifications = notifier.drain().await;
    json_result(&NotificationsOutput { notifications })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_client::Notifier;
    use tether_core::config::NotificationConfig;

    #[tokio::test]
    async fn test_drains_queue() {
        let notifier = QueueNotifier::new();
        notifier
            .notify(&Notification::from(&NotificationConfig::default()))
            .await
            .unwrap();

        let first: NotificationsOutput = crate::tools::testing::output(&notifications_impl(&notifier).await.unwrap());
        assert_eq!(first.notifications.len(), 1);
        assert_eq!(first.notifications[0].title, "Update available");

        let second: NotificationsOutput = crate::tools::testing::output(&notifications_impl(&notifier).await.unwrap());
        assert!(second.notifications.is_empty());
    }
}
