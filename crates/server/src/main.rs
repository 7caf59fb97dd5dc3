//! swcache server entry point.
//!
//! This is the main binary that boots the offline worker and serves it as an
//! MCP server on stdio transport. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::config::AppConfig;
use swcache_core::{CacheDb, CacheRouter, ServiceWorker};
use tracing_subscriber::EnvFilter;

mod handler;
mod platform;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = config.origin_url()?;

    tracing::info!(
        origin = %origin,
        db_path = %config.db_path.display(),
        version = %config.worker.cache_version,
        "Starting swcache server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let router = CacheRouter::new(config.worker.clone(), origin, Arc::new(db.clone()), network)?;

    let platform = Arc::new(platform::ServerPlatform::new());
    let worker = Arc::new(ServiceWorker::new(router, platform.clone(), Arc::new(db.clone())));

    let handler = handler::WorkerServer::new(worker, platform, db);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
