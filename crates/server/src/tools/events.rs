//! Tools that deliver worker events: message, sync, periodic sync, push
//! and notification clicks.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::{Notification, SyncReport};
use swcache_core::{Error, ServiceWorker};

use super::json_result;
use crate::platform::ServerPlatform;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message posted by a page, e.g. `{"type": "CLEANUP_CACHE"}`.
    pub message: serde_json::Value,
}

/// Parameters for the worker_sync and worker_periodic_sync tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync registration tag.
    pub tag: String,
}

/// Output from the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    /// False for tags the worker does not recognise.
    pub handled: bool,
    pub report: Option<SyncReport>,
}

/// Output from the worker_periodic_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPeriodicSyncOutput {
    pub tag: String,
    pub handled: bool,
    /// Content pages refreshed.
    pub refreshed: Option<usize>,
}

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Push payload text, usually a JSON object with `title`, `body` and `url`.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerNotificationClickParams {
    /// Action button pressed ("explore" or "close"); omit for a body click.
    #[serde(default)]
    pub action: Option<String>,

    /// Notification that was clicked (default: the last one shown).
    #[serde(default)]
    pub notification: Option<Notification>,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let outcome = worker.message(&params.message).await?;
    json_result(&outcome)
}

/// Implementation of the worker_sync tool.
pub async fn sync_impl(worker: &ServiceWorker, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    let report = worker.sync(&params.tag).await?;
    json_result(&WorkerSyncOutput { handled: report.is_some(), tag: params.tag, report })
}

/// Implementation of the worker_periodic_sync tool.
pub async fn periodic_sync_impl(
    worker: &ServiceWorker, params: WorkerSyncParams,
) -> Result<CallToolResult, McpError> {
    let refreshed = worker.periodic_sync(&params.tag).await;
    json_result(&WorkerPeriodicSyncOutput { handled: refreshed.is_some(), tag: params.tag, refreshed })
}

/// Implementation of the worker_push tool.
pub async fn push_impl(worker: &ServiceWorker, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.push(params.payload.as_deref().map(str::as_bytes)).await?;
    json_result(&notification)
}

/// Implementation of the worker_notification_click tool.
pub async fn notification_click_impl(
    worker: &ServiceWorker, platform: &ServerPlatform, params: WorkerNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let notification = match params.notification {
        Some(notification) => notification,
        None => platform
            .last_notification()
            .await
            .ok_or_else(|| Error::InvalidInput("no notification has been shown".to_string()))?,
    };

    let outcome = worker.notification_click(params.action.as_deref(), &notification).await?;
    json_result(&outcome)
}
