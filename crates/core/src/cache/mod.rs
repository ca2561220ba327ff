//! SQLite-backed partitioned response cache.
//!
//! Models the host's cache storage: named partitions, each mapping a GET
//! request identity to the last response stored for it. Access is async via
//! tokio-rusqlite. It supports:
//!
//! - Lazy partition creation and whole-partition sweeps
//! - Last-write-wins entry replacement (no TTL, no LRU)
//! - Lookups across all partitions or an explicit ordered subset
//! - Automatic schema migrations

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::{Partition, PartitionInfo, StoredResponse};
