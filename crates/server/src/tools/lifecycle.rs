//! worker_install, worker_activate and worker_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStorage, ServiceWorker, SubscriptionQueue, WorkerState};

use super::json_result;
use crate::platform::{PlatformSnapshot, ServerPlatform};

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerInstallOutput {
    pub state: WorkerState,
    /// Static manifest entries cached.
    pub static_cached: usize,
    /// Content pages warmed (best effort).
    pub pages_warmed: usize,
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerActivateOutput {
    pub state: WorkerState,
    /// Partitions deleted because they belong to another version.
    pub pruned: Vec<String>,
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub state: WorkerState,
    pub cache_version: String,
    pub partitions: Vec<String>,
    pub pending_subscriptions: usize,
    pub platform: PlatformSnapshot,
}

/// Implementation of the worker_install tool.
pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    let output = WorkerInstallOutput {
        state: worker.state().await,
        static_cached: report.static_cached,
        pages_warmed: report.pages_warmed,
    };
    json_result(&output)
}

/// Implementation of the worker_activate tool.
pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let pruned = worker.activate().await?;
    json_result(&WorkerActivateOutput { state: worker.state().await, pruned })
}

/// Implementation of the worker_status tool.
pub async fn status_impl(
    worker: &ServiceWorker, platform: &ServerPlatform, queue: &dyn SubscriptionQueue,
) -> Result<CallToolResult, McpError> {
    let router = worker.router();
    let output = WorkerStatusOutput {
        state: worker.state().await,
        cache_version: router.config().cache_version.clone(),
        partitions: router.storage().partitions().await?,
        pending_subscriptions: queue.pending().await?.len(),
        platform: platform.snapshot().await,
    };
    json_result(&output)
}
