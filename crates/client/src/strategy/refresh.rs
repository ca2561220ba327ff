//! Background refresh queue.
//!
//! Cache-first hits enqueue a refresh and return without waiting. A single
//! background task drains the queue in order: successful fetches overwrite
//! the dynamic partition entry, failures go to a separate failure channel
//! and never reach the request that triggered them.
//!
//! A URL is queued at most once until the task picks it up.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tether_core::{CacheDb, Error, Request};
use tokio::sync::{mpsc, oneshot};

use crate::fetch::{FetchOptions, Network};

/// A refresh that did not update the cache.
#[derive(Debug)]
pub struct RefreshFailure {
    pub url: String,
    pub error: Error,
}

enum Command {
    Refresh(Request),
    Flush(oneshot::Sender<()>),
}

/// Handle for enqueueing background refreshes.
#[derive(Clone, Debug)]
pub struct RefreshQueue {
    tx: mpsc::UnboundedSender<Command>,
    pending: Pending,
}

type Pending = Arc<Mutex<HashSet<String>>>;

fn pending_set(pending: &Pending) -> std::sync::MutexGuard<'_, HashSet<String>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Refresh(req) => write!(f, "Refresh({})", req.cache_url()),
            Command::Flush(_) => write!(f, "Flush"),
        }
    }
}

impl RefreshQueue {
    /// Spawn the refresh task on the current tokio runtime.
    ///
    /// Returns the queue handle and the receiving end of the failure channel.
    /// The task exits once every handle is dropped.
    pub fn spawn(
        cache: CacheDb, network: Arc<dyn Network>, partition: String,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (failures_tx, failures_rx) = mpsc::unbounded_channel();

        let pending = Pending::default();

        tokio::spawn(run(rx, cache, network, partition, failures_tx, pending.clone()));

        (Self { tx, pending }, failures_rx)
    }

    /// Queue a refresh. Never blocks; dropped silently if the task is gone
    /// or the same URL is already waiting.
    pub fn enqueue(&self, request: Request) {
        let url = request.cache_url();
        if !pending_set(&self.pending).insert(url.clone()) {
            tracing::trace!(url = %url, "refresh already queued");
            return;
        }
        if self.tx.send(Command::Refresh(request)).is_err() {
            pending_set(&self.pending).remove(&url);
            tracing::debug!("refresh queue closed; dropping refresh");
        }
    }

    /// Wait until every refresh queued before this call has finished.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Command>, cache: CacheDb, network: Arc<dyn Network>, partition: String,
    failures: mpsc::UnboundedSender<RefreshFailure>, pending: Pending,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Refresh(request) => {
                pending_set(&pending).remove(&request.cache_url());
                if let Err(error) = refresh(&cache, network.as_ref(), &partition, &request).await {
                    let url = request.cache_url();
                    tracing::debug!(url = %url, "background refresh failed: {error}");
                    let _ = failures.send(RefreshFailure { url, error });
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("refresh queue stopped");
}

async fn refresh(cache: &CacheDb, network: &dyn Network, partition: &str, request: &Request) -> Result<(), Error> {
    let response = network.fetch(request, FetchOptions::default()).await?;
    if !response.is_success() {
        return Err(Error::Network(format!("{} answered {}", request.cache_url(), response.status.as_u16())));
    }

    cache.open_partition(partition).await?.put(request, &response.to_stored()).await?;
    tracing::debug!(url = %request.cache_url(), "background refresh stored");
    Ok(())
}
