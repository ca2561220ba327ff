//! Version check against the installed copy of the canonical resource.

use std::sync::Arc;

use tether_core::{CacheDb, Error, Request, UpdateResult};
use url::Url;

use crate::fetch::{FetchOptions, Network};
use crate::notify::{Notification, Notifier};

/// Compares a fresh copy of the canonical resource with the snapshot taken at
/// install time, read from the snapshot partition only.
///
/// The snapshot is never overwritten here, so every check after a deploy keeps
/// reporting `NewVersionAvailable` until a new install replaces it.
pub struct UpdateChecker {
    cache: CacheDb,
    network: Arc<dyn Network>,
    notifier: Arc<dyn Notifier>,
    canonical: Request,
    snapshot_partition: String,
    notification: Notification,
}

impl UpdateChecker {
    pub fn new(
        cache: CacheDb, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>, canonical: Url,
        snapshot_partition: String, notification: Notification,
    ) -> Self {
        Self { cache, network, notifier, canonical: Request::get(canonical), snapshot_partition, notification }
    }

    /// Run one check. Failures are logged and reported as `CheckFailed`.
    pub async fn check_for_updates(&self) -> UpdateResult {
        match self.compare().await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(url = %self.canonical.cache_url(), "update check failed: {e}");
                UpdateResult::CheckFailed
            }
        }
    }

    async fn compare(&self) -> Result<UpdateResult, Error> {
        let url = self.canonical.cache_url();
        let fresh = self.network.fetch(&self.canonical, FetchOptions::bypass_cache()).await?;
        if !fresh.is_success() {
            return Err(Error::UpdateCheck(format!("{url} answered {}", fresh.status.as_u16())));
        }
        let fresh = fresh.text().map_err(|e| Error::UpdateCheck(e.to_string()))?;

        let partitions = [self.snapshot_partition.as_str()];
        let Some(snapshot) = self.cache.match_request(&self.canonical, Some(&partitions[..])).await? else {
            tracing::info!(url = %url, "no cached snapshot; treating as up to date");
            return Ok(UpdateResult::UpToDate);
        };
        let snapshot = snapshot.text().map_err(|e| Error::UpdateCheck(e.to_string()))?;

        if snapshot == fresh {
            tracing::debug!(url = %url, "canonical resource unchanged");
            return Ok(UpdateResult::UpToDate);
        }

        tracing::info!(url = %url, "new version available");
        if let Err(e) = self.notifier.notify(&self.notification).await {
            tracing::warn!("update notification failed: {e}");
        }
        Ok(UpdateResult::NewVersionAvailable)
    }
}
