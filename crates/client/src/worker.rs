//! Worker lifecycle: install, activate, intercept, messages, periodic checks.
//!
//! ### Lifecycle
//! - `Parsed → Installing → Installed → Activating → Activated`.
//! - A failed install leaves the worker `Redundant`; nothing is written.
//! - `SKIP_WAITING` activates an installed worker at once, or right after an
//!   install that is still running.
//!
//! ### Interception
//! - Requests are served in every lifecycle state; the host serializes
//!   lifecycle events.
//! - `Skip` requests are handed back to the host untouched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tether_core::config::ConfigError;
use tether_core::{
    AppConfig, CacheDb, ControlMessage, Error, Request, RequestClassification, RequestClassifier, StoredResponse,
    UpdateResult,
};
use tokio::sync::{RwLock, mpsc};
use url::Url;

use crate::fallback::FallbackProvider;
use crate::fetch::{FetchOptions, Network};
use crate::notify::{Notification, Notifier};
use crate::response::Response;
use crate::strategy::{RefreshFailure, RefreshQueue, StrategyExecutor};
use crate::update::UpdateChecker;

/// Resolved worker settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub origin: Url,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub precache: Vec<Url>,
    pub shell: Url,
    pub version_check: Url,
    pub offline_data: Url,
    pub analytics_markers: Vec<String>,
    pub notification: Notification,
}

impl WorkerSettings {
    /// Resolve every configured URL against the origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for the first URL that does not resolve.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let precache = config
            .precache_urls
            .iter()
            .map(|u| config.resolve("precache_urls", u))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin: config.origin_url()?,
            static_cache: config.static_cache_name.clone(),
            dynamic_cache: config.dynamic_cache_name.clone(),
            precache,
            shell: config.resolve("shell_url", &config.shell_url)?,
            version_check: config.resolve("version_check_url", &config.version_check_url)?,
            offline_data: config.resolve("offline_data_url", &config.offline_data_url)?,
            analytics_markers: config.analytics_markers.clone(),
            notification: Notification::from(&config.notification),
        })
    }

    /// Partitions that survive activation.
    pub fn retained(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.dynamic_cache.as_str()]
    }

    /// Partitions searched first on lookups, newest writes first.
    pub fn lookup_order(&self) -> Vec<String> {
        vec![self.dynamic_cache.clone(), self.static_cache.clone()]
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// What the host should do with an intercepted request.
#[derive(Debug)]
pub enum Intercept {
    /// Let the request continue to the network untouched.
    PassThrough,
    /// Answer the request with this response.
    Respond(Response),
}

/// Outcome of an activation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    /// Partitions removed by the sweep.
    pub deleted: Vec<String>,
}

#[derive(Debug)]
struct WorkerState {
    lifecycle: Lifecycle,
    skip_waiting: bool,
}

/// The offline worker.
pub struct OfflineWorker {
    settings: WorkerSettings,
    cache: CacheDb,
    network: Arc<dyn Network>,
    classifier: RequestClassifier,
    executor: StrategyExecutor,
    updates: UpdateChecker,
    state: RwLock<WorkerState>,
}

impl OfflineWorker {
    /// Build the worker and spawn its background refresh task.
    ///
    /// Returns the worker and the receiving end of the refresh failure channel.
    pub fn new(
        settings: WorkerSettings, cache: CacheDb, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshFailure>) {
        let (refresh, failures) = RefreshQueue::spawn(cache.clone(), network.clone(), settings.dynamic_cache.clone());
        let fallback = FallbackProvider::new(cache.clone(), settings.shell.clone(), settings.lookup_order());
        let executor = StrategyExecutor::new(
            cache.clone(),
            network.clone(),
            fallback,
            refresh,
            settings.static_cache.clone(),
            settings.dynamic_cache.clone(),
        );
        let updates = UpdateChecker::new(
            cache.clone(),
            network.clone(),
            notifier,
            settings.version_check.clone(),
            settings.static_cache.clone(),
            settings.notification.clone(),
        );
        let classifier = RequestClassifier::new(settings.analytics_markers.iter().cloned());

        let worker = Self {
            settings,
            cache,
            network,
            classifier,
            executor,
            updates,
            state: RwLock::new(WorkerState { lifecycle: Lifecycle::Parsed, skip_waiting: false }),
        };
        (worker, failures)
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub async fn lifecycle(&self) -> Lifecycle {
        self.state.read().await.lifecycle
    }

    pub fn classify(&self, request: &Request) -> RequestClassification {
        self.classifier.classify(request)
    }

    /// Pre-cache the configured assets into the static partition.
    ///
    /// Every asset is fetched before any is stored; one failure aborts the
    /// install and the worker becomes `Redundant`. Returns the number of
    /// cached assets.
    pub async fn on_install(&self) -> Result<usize, Error> {
        self.set_lifecycle(Lifecycle::Installing).await;
        tracing::info!(partition = %self.settings.static_cache, assets = self.settings.precache.len(), "installing");

        let result = self.precache().await;
        let activate_now = {
            let mut state = self.state.write().await;
            match &result {
                Ok(_) => state.lifecycle = Lifecycle::Installed,
                Err(_) => state.lifecycle = Lifecycle::Redundant,
            }
            let skip = std::mem::take(&mut state.skip_waiting);
            result.is_ok() && skip
        };

        match &result {
            Ok(count) => tracing::info!(cached = count, "install complete"),
            Err(e) => tracing::error!("install failed: {e}"),
        }

        if activate_now {
            self.on_activate().await;
        }
        result
    }

    async fn precache(&self) -> Result<usize, Error> {
        let mut fetched = Vec::with_capacity(self.settings.precache.len());
        for url in &self.settings.precache {
            let request = Request::get(url.clone());
            let response = self.network.fetch(&request, FetchOptions::default()).await?;
            if !response.is_success() {
                return Err(Error::Network(format!("{url} answered {}", response.status.as_u16())));
            }
            fetched.push((request, response.to_stored()));
        }

        let partition = self.cache.open_partition(&self.settings.static_cache).await?;
        for (request, stored) in &fetched {
            partition.put(request, stored).await?;
        }
        Ok(fetched.len())
    }

    /// Sweep every partition outside the current pair and take over.
    ///
    /// Sweep failures are logged; activation still completes.
    pub async fn on_activate(&self) -> ActivateReport {
        self.set_lifecycle(Lifecycle::Activating).await;

        let deleted = match self.cache.sweep(&self.settings.retained()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!("cache sweep failed: {e}");
                Vec::new()
            }
        };
        for name in &deleted {
            tracing::info!(partition = %name, "deleted old cache");
        }

        self.set_lifecycle(Lifecycle::Activated).await;
        tracing::info!("activated");
        ActivateReport { deleted }
    }

    /// Answer an intercepted request.
    ///
    /// # Errors
    ///
    /// Returns the strategy's error once network, cache and fallback are exhausted.
    pub async fn on_intercept(&self, request: &Request) -> Result<Intercept, Error> {
        let classification = self.classifier.classify(request);
        tracing::debug!(url = %request.cache_url(), class = classification.as_str(), "intercept");

        if classification == RequestClassification::Skip {
            return Ok(Intercept::PassThrough);
        }
        self.executor.execute(classification, request).await.map(Intercept::Respond)
    }

    /// Handle a control message from the page.
    pub async fn on_message(&self, message: ControlMessage) -> Result<(), Error> {
        match message {
            ControlMessage::SkipWaiting => {
                let activate_now = {
                    let mut state = self.state.write().await;
                    match state.lifecycle {
                        Lifecycle::Installed => true,
                        Lifecycle::Parsed | Lifecycle::Installing => {
                            state.skip_waiting = true;
                            false
                        }
                        _ => false,
                    }
                };
                if activate_now {
                    self.on_activate().await;
                }
                Ok(())
            }
            ControlMessage::CacheData { payload } => self.store_offline_data(&payload).await,
        }
    }

    /// Run the update check.
    pub async fn on_periodic_trigger(&self) -> UpdateResult {
        self.updates.check_for_updates().await
    }

    /// The last payload stored through `CACHE_DATA`.
    pub async fn offline_data(&self) -> Result<Option<serde_json::Value>, Error> {
        let request = Request::get(self.settings.offline_data.clone());
        let dynamic = [self.settings.dynamic_cache.as_str()];
        let Some(stored) = self.cache.match_request(&request, Some(&dynamic)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&stored.body)
            .map(Some)
            .map_err(|e| Error::CorruptEntry(format!("{}: {e}", stored.url)))
    }

    /// Wait for queued background refreshes.
    pub async fn flush_refreshes(&self) {
        self.executor.refresh_queue().flush().await;
    }

    async fn store_offline_data(&self, payload: &serde_json::Value) -> Result<(), Error> {
        let body = serde_json::to_vec(payload).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let request = Request::get(self.settings.offline_data.clone());
        let stored = StoredResponse::new(
            request.cache_url(),
            200,
            Some("application/json".to_string()),
            vec![("content-type".to_string(), "application/json".to_string())],
            body,
        );

        self.cache.open_partition(&self.settings.dynamic_cache).await?.put(&request, &stored).await?;
        tracing::info!(url = %request.cache_url(), "offline data stored");
        Ok(())
    }

    async fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.state.write().await.lifecycle = lifecycle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::QueueNotifier;
    use crate::response::ResponseSource;
    use crate::testing::{FakeNetwork, ORIGIN, url};
    use reqwest::StatusCode;
    use serde_json::json;
    use tether_core::RequestMode;

    struct Harness {
        cache: CacheDb,
        network: Arc<FakeNetwork>,
        notifier: Arc<QueueNotifier>,
        worker: OfflineWorker,
    }

    async fn harness() -> Harness {
        let config = AppConfig { origin: ORIGIN.to_string(), ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        let cache = CacheDb::open_in_memory().await.unwrap();
        let network = FakeNetwork::new();
        let notifier = Arc::new(QueueNotifier::new());
        let (worker, _failures) = OfflineWorker::new(settings, cache.clone(), network.clone(), notifier.clone());
        Harness { cache, network, notifier, worker }
    }

    fn route_precache(network: &FakeNetwork) {
        network.route("/", 200, "text/html", "<html>root</html>");
        network.route("/index.html", 200, "text/html", "<html>shell</html>");
        network.route("/manifest.json", 200, "application/manifest+json", "{}");
    }

    fn respond(intercept: Intercept) -> Response {
        match intercept {
            Intercept::Respond(response) => response,
            Intercept::PassThrough => panic!("expected a response"),
        }
    }

    #[test]
    fn test_settings_resolve_against_origin() {
        let config = AppConfig { origin: ORIGIN.to_string(), ..Default::default() };
        let settings = WorkerSettings::from_config(&config).unwrap();
        assert_eq!(settings.shell.as_str(), "https://app.test/index.html");
        assert_eq!(settings.precache.len(), 3);
        assert_eq!(settings.offline_data.as_str(), "https://app.test/offline-data");
        assert_eq!(settings.retained(), ["static-cache-v1", "dynamic-cache-v1"]);
        assert_eq!(settings.lookup_order(), vec!["dynamic-cache-v1", "static-cache-v1"]);
    }

    #[tokio::test]
    async fn test_install_precaches_static_partition() {
        let h = harness().await;
        route_precache(&h.network);

        assert_eq!(h.worker.lifecycle().await, Lifecycle::Parsed);
        assert_eq!(h.worker.on_install().await.unwrap(), 3);
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Installed);

        let stored = h
            .cache
            .match_request(&Request::get(url("/index.html")), Some(&["static-cache-v1"]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_install_is_atomic() {
        let h = harness().await;
        h.network.route("/", 200, "text/html", "root");
        h.network.route("/index.html", 200, "text/html", "shell");

        assert!(h.worker.on_install().await.is_err());
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Redundant);
        assert!(h.cache.partition_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_sweeps_old_partitions() {
        let h = harness().await;
        for name in ["static-cache-v1", "dynamic-cache-v1", "old-cache-v0"] {
            h.cache.open_partition(name).await.unwrap();
        }

        let report = h.worker.on_activate().await;

        assert_eq!(report.deleted, vec!["old-cache-v0".to_string()]);
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Activated);
        assert_eq!(h.cache.partition_names().await.unwrap(), vec!["static-cache-v1", "dynamic-cache-v1"]);
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_installed_worker() {
        let h = harness().await;
        route_precache(&h.network);
        h.worker.on_install().await.unwrap();

        h.worker.on_message(ControlMessage::SkipWaiting).await.unwrap();

        assert_eq!(h.worker.lifecycle().await, Lifecycle::Activated);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_activates_after() {
        let h = harness().await;
        route_precache(&h.network);

        h.worker.on_message(ControlMessage::SkipWaiting).await.unwrap();
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Parsed);

        h.worker.on_install().await.unwrap();
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Activated);
    }

    #[tokio::test]
    async fn test_failed_install_clears_skip_waiting() {
        let h = harness().await;
        h.worker.on_message(ControlMessage::SkipWaiting).await.unwrap();

        assert!(h.worker.on_install().await.is_err());
        assert_eq!(h.worker.lifecycle().await, Lifecycle::Redundant);

        route_precache(&h.network);
        h.worker.on_install().await.unwrap();

        assert_eq!(h.worker.lifecycle().await, Lifecycle::Installed);
    }

    #[tokio::test]
    async fn test_cache_data_round_trip() {
        let h = harness().await;
        assert_eq!(h.worker.offline_data().await.unwrap(), None);

        let payload = json!({ "drafts": [{ "id": 1, "text": "hello" }] });
        h.worker
            .on_message(ControlMessage::CacheData { payload: payload.clone() })
            .await
            .unwrap();

        assert_eq!(h.worker.offline_data().await.unwrap(), Some(payload));
    }

    #[tokio::test]
    async fn test_non_get_passes_through() {
        let h = harness().await;
        h.network.route("/api/items", 200, "application/json", "[]");

        for method in ["POST", "PUT", "DELETE"] {
            let request = Request::new(method, url("/api/items"), RequestMode::Subresource);
            assert!(matches!(h.worker.on_intercept(&request).await.unwrap(), Intercept::PassThrough));
        }
        assert_eq!(h.network.calls_to("/api/items"), 0);
    }

    #[tokio::test]
    async fn test_analytics_and_cross_origin_pass_through() {
        let h = harness().await;
        let analytics = Request::get(Url::parse("https://www.googletagmanager.com/gtag/js?id=1").unwrap());
        let extension = Request::get(Url::parse("chrome-extension://abc/script.js").unwrap());

        assert!(matches!(h.worker.on_intercept(&analytics).await.unwrap(), Intercept::PassThrough));
        assert!(matches!(h.worker.on_intercept(&extension).await.unwrap(), Intercept::PassThrough));
    }

    #[tokio::test]
    async fn test_offline_navigation_after_install_serves_shell() {
        let h = harness().await;
        route_precache(&h.network);
        h.worker.on_install().await.unwrap();
        h.worker.on_activate().await;
        h.network.set_offline(true);

        let response = respond(h.worker.on_intercept(&Request::navigate(url("/settings"))).await.unwrap());

        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(response.body.as_ref(), b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_latest_shell() {
        let h = harness().await;
        route_precache(&h.network);
        h.worker.on_install().await.unwrap();
        h.worker.on_activate().await;

        h.network.route("/index.html", 200, "text/html", "<html>shell v2</html>");
        respond(h.worker.on_intercept(&Request::navigate(url("/index.html"))).await.unwrap());
        h.network.set_offline(true);

        let response = respond(h.worker.on_intercept(&Request::navigate(url("/index.html"))).await.unwrap());

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.body.as_ref(), b"<html>shell v2</html>");

        let fallback = respond(h.worker.on_intercept(&Request::navigate(url("/settings"))).await.unwrap());
        assert_eq!(fallback.body.as_ref(), b"<html>shell v2</html>");
    }

    #[tokio::test]
    async fn test_offline_image_gets_placeholder() {
        let h = harness().await;
        h.network.set_offline(true);

        let response = respond(h.worker.on_intercept(&Request::get(url("/img/hero.png"))).await.unwrap());

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.content_type().unwrap().starts_with("image/"));
    }

    #[tokio::test]
    async fn test_periodic_trigger_detects_new_version() {
        let h = harness().await;
        route_precache(&h.network);
        h.worker.on_install().await.unwrap();
        assert_eq!(h.worker.on_periodic_trigger().await, UpdateResult::UpToDate);

        h.network.route("/index.html", 200, "text/html", "<html>shell v2</html>");

        assert_eq!(h.worker.on_periodic_trigger().await, UpdateResult::NewVersionAvailable);
        assert_eq!(h.notifier.delivered(), 1);
    }

    #[tokio::test]
    async fn test_flush_refreshes_after_cache_hit() {
        let h = harness().await;
        route_precache(&h.network);
        h.network.route("/app.js", 200, "text/javascript", "v1");
        h.worker.on_intercept(&Request::get(url("/app.js"))).await.unwrap();
        h.network.route("/app.js", 200, "text/javascript", "v2");

        let cached = respond(h.worker.on_intercept(&Request::get(url("/app.js"))).await.unwrap());
        h.worker.flush_refreshes().await;

        assert_eq!(cached.body.as_ref(), b"v1");
        let stored = h.cache.match_request(&Request::get(url("/app.js")), None).await.unwrap().unwrap();
        assert_eq!(stored.body, b"v2");
    }
}
