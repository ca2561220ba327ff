//! Core types and shared functionality for tether.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request model and the request classifier
//! - Control message and update-check types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod message;
pub mod request;

pub use cache::{CacheDb, Partition, StoredResponse};
pub use classify::{RequestClassification, RequestClassifier};
pub use config::AppConfig;
pub use error::Error;
pub use message::{ControlMessage, UpdateResult};
pub use request::{Request, RequestMode};
