//! Cache inspection tools.
//!
//! This module provides read-only views of the partitioned cache.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
