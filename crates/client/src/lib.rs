//! Worker-side code for tether.
//!
//! This crate provides the network seam and reqwest fetch client, the caching
//! strategies with their background refresh queue, the fallback provider, the
//! update checker and the worker lifecycle shared by the server.

pub mod fallback;
pub mod fetch;
pub mod notify;
pub mod response;
pub mod strategy;
pub mod update;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fallback::FallbackProvider;
pub use fetch::{FetchClient, FetchConfig, FetchOptions, Network};
pub use notify::{Notification, Notifier, QueueNotifier};
pub use response::{Response, ResponseSource};
pub use strategy::{RefreshFailure, RefreshQueue, StrategyExecutor};
pub use update::UpdateChecker;
pub use worker::{ActivateReport, Intercept, Lifecycle, OfflineWorker, WorkerSettings};
