//! tether-worker entry point.
//!
//! Boots the offline worker, runs install and activate, starts the periodic
//! update check and serves the lifecycle tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tether_client::{FetchClient, FetchConfig, OfflineWorker, QueueNotifier, RefreshFailure, WorkerSettings};
use tether_core::{AppConfig, CacheDb};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let settings = WorkerSettings::from_config(&config)?;
    tracing::info!(origin = %settings.origin, db = %config.db_path.display(), "Starting tether worker on stdio transport");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let notifier = Arc::new(QueueNotifier::new());
    let (worker, failures) = OfflineWorker::new(settings, cache, network, notifier.clone());
    let worker = Arc::new(worker);

    tokio::spawn(log_refresh_failures(failures));

    match worker.on_install().await {
        Ok(_) => {
            worker.on_activate().await;
        }
        Err(e) => tracing::warn!("boot install failed, serving without pre-cache: {e}"),
    }

    if let Some(period) = config.update_check_interval() {
        tokio::spawn(periodic_update_checks(worker.clone(), period));
    }

    let handler = handler::TetherServer::new(worker.clone(), notifier);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.flush_refreshes().await;
    tracing::info!("tether worker stopped");

    Ok(())
}

async fn log_refresh_failures(mut failures: mpsc::UnboundedReceiver<RefreshFailure>) {
    while let Some(failure) = failures.recv().await {
        tracing::warn!(url = %failure.url, "background refresh failed: {}", failure.error);
    }
}

async fn periodic_update_checks(worker: Arc<OfflineWorker>, period: std::time::Duration) {
    let mut ticker = tokio::time::interval(period);
    // the first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let result = worker.on_periodic_trigger().await;
        tracing::info!(?result, "periodic update check");
    }
}
