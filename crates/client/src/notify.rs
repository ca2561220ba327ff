//! User-visible notifications.
//!
//! Display is the host's job; the worker only hands over {title, body, icon, tag}.

use serde::{Deserialize, Serialize};
use tether_core::Error;
use tether_core::config::NotificationConfig;
use tokio::sync::Mutex;

/// A notification-display call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
}

impl From<&NotificationConfig> for Notification {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            title: config.title.clone(),
            body: config.body.clone(),
            icon: config.icon.clone(),
            tag: config.tag.clone(),
        }
    }
}

/// Sink for notification-display calls.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), Error>;
}

/// Notifier that queues notifications until the host collects them.
///
/// A notification with the same tag as a queued one replaces it, the way
/// hosts collapse tagged notifications.
#[derive(Debug, Default)]
pub struct QueueNotifier {
    pending: Mutex<Vec<Notification>>,
    delivered: std::sync::atomic::AtomicU64,
}

impl QueueNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all pending notifications.
    pub async fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Number of notify calls received so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Notifier for QueueNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), Error> {
        let mut pending = self.pending.lock().await;
        pending.retain(|n| n.tag != notification.tag);
        pending.push(notification.clone());
        self.delivered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        tracing::info!(title = %notification.title, tag = %notification.tag, "notification queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(tag: &str, body: &str) -> Notification {
        Notification { title: "Update available".into(), body: body.into(), icon: "/icon.png".into(), tag: tag.into() }
    }

    #[test]
    fn test_from_config() {
        let n = Notification::from(&NotificationConfig::default());
        assert_eq!(n.tag, "app-update");
        assert_eq!(n.icon, "/icons/icon-192x192.png");
    }

    #[tokio::test]
    async fn test_queue_collapses_same_tag() {
        let notifier = QueueNotifier::new();
        notifier.notify(&note("app-update", "first")).await.unwrap();
        notifier.notify(&note("app-update", "second")).await.unwrap();
        notifier.notify(&note("other", "third")).await.unwrap();

        assert_eq!(notifier.delivered(), 3);
        let pending = notifier.drain().await;
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].body, "second");
        assert!(notifier.drain().await.is_empty());
    }
}
