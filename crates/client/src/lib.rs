//! Network client for swcache.
//!
//! This crate provides the reqwest-backed implementation of the core
//! `Fetcher` trait and URL resolution against the site origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, resolve};
