//! SQLite-backed cache partitions and the offline subscription queue.
//!
//! This module provides persistent, named cache partitions using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Request-keyed storage using SHA-256 hashing of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Wholesale partition deletion and per-entry removal

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod queue;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use queue::{QueuedSubscription, SubscriptionQueue};
pub use storage::CacheStorage;
