//! Cache-related MCP tools.
//!
//! This module provides read access to the worker's cache partitions.

pub mod get;
pub mod keys;

pub use get::{CacheGetParams, get_impl};
pub use keys::{CacheKeysParams, keys_impl};
