//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model and the `Fetcher` network seam
//! - Persistent cache partitions with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The offline worker: request routing, caching strategies and lifecycle

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheStorage, QueuedSubscription, SubscriptionQueue};
pub use error::Error;
pub use http::{Fetcher, Headers, Request, Response};
pub use worker::{CacheRouter, Interception, Route, Routed, ServiceWorker, WorkerState};
