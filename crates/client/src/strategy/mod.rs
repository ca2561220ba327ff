//! Caching strategies.
//!
//! ### Navigate: network-first, offline fallback
//! - Fetch; store successful documents in the dynamic partition; return the live response.
//! - Network failure: cached copy, else the offline shell.
//!
//! ### StaticAsset: cache-first, background refresh
//! - Hit: return the cached copy and queue a refresh into the dynamic partition.
//! - Miss: fetch and store; on failure, placeholder for images, error otherwise.
//!
//! ### ApiData: network-first, cache as backup
//! - Fetch; store only `200 OK` responses.
//! - Network failure: cached copy, else error.
//!
//! Cache lookups try the dynamic partition, then the static one, then any
//! other partition, so the most recent write wins. The static partition is
//! never written here.

pub mod refresh;

pub use refresh::{RefreshFailure, RefreshQueue};

use std::sync::Arc;

use reqwest::StatusCode;
use tether_core::{CacheDb, Error, Request, RequestClassification};

use crate::fallback::FallbackProvider;
use crate::fetch::{FetchOptions, Network};
use crate::response::{Response, ResponseSource};

/// Runs the strategy selected by a request's classification.
pub struct StrategyExecutor {
    cache: CacheDb,
    network: Arc<dyn Network>,
    fallback: FallbackProvider,
    refresh: RefreshQueue,
    static_cache: String,
    dynamic_cache: String,
}

impl StrategyExecutor {
    pub fn new(
        cache: CacheDb, network: Arc<dyn Network>, fallback: FallbackProvider, refresh: RefreshQueue,
        static_cache: String, dynamic_cache: String,
    ) -> Self {
        Self { cache, network, fallback, refresh, static_cache, dynamic_cache }
    }

    /// Produce a response for the request.
    ///
    /// `Skip` requests go straight to the network, uncached.
    pub async fn execute(&self, classification: RequestClassification, request: &Request) -> Result<Response, Error> {
        match classification {
            RequestClassification::Navigate => self.network_first_navigate(request).await,
            RequestClassification::StaticAsset => self.cache_first_asset(request).await,
            RequestClassification::ApiData => self.network_first_data(request).await,
            RequestClassification::Skip => self.network.fetch(request, FetchOptions::default()).await,
        }
    }

    /// Handle for the background refresh queue.
    pub fn refresh_queue(&self) -> &RefreshQueue {
        &self.refresh
    }

    async fn network_first_navigate(&self, request: &Request) -> Result<Response, Error> {
        let error = match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_dynamic(request, &response).await;
                }
                return Ok(response);
            }
            Err(e) => e,
        };
        tracing::debug!(url = %request.cache_url(), "navigation fetch failed: {error}");

        if let Some(cached) = self.lookup(request).await {
            return Ok(cached);
        }

        self.fallback
            .fallback_for(RequestClassification::Navigate, request)
            .await
            .ok_or_else(|| Error::NoFallback(format!("{} ({error})", request.cache_url())))
    }

    async fn cache_first_asset(&self, request: &Request) -> Result<Response, Error> {
        if let Some(cached) = self.lookup(request).await {
            self.refresh.enqueue(request.clone());
            return Ok(cached);
        }

        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_dynamic(request, &response).await;
                }
                Ok(response)
            }
            Err(error) => {
                tracing::debug!(url = %request.cache_url(), "asset fetch failed: {error}");
                self.fallback
                    .fallback_for(RequestClassification::StaticAsset, request)
                    .await
                    .ok_or(error)
            }
        }
    }

    async fn network_first_data(&self, request: &Request) -> Result<Response, Error> {
        match self.network.fetch(request, FetchOptions::default()).await {
            Ok(response) => {
                if response.status == StatusCode::OK {
                    self.store_dynamic(request, &response).await;
                }
                Ok(response)
            }
            Err(error) => {
                tracing::debug!(url = %request.cache_url(), "data fetch failed: {error}");
                self.lookup(request).await.ok_or(error)
            }
        }
    }

    /// Cache lookup, current partitions first. Storage errors count as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        let order = [self.dynamic_cache.as_str(), self.static_cache.as_str()];
        match self.cache.match_preferring(request, &order).await {
            Ok(hit) => hit.map(|stored| Response::from_stored(stored, ResponseSource::Cache)),
            Err(e) => {
                tracing::warn!(url = %request.cache_url(), "cache lookup failed: {e}");
                None
            }
        }
    }

    /// Write a copy into the dynamic partition. Failures are logged; the
    /// live response is still returned.
    async fn store_dynamic(&self, request: &Request, response: &Response) {
        let result = async {
            let partition = self.cache.open_partition(&self.dynamic_cache).await?;
            partition.put(request, &response.to_stored()).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(url = %request.cache_url(), partition = %self.dynamic_cache, "cache write failed: {e}");
        }
    }
}
