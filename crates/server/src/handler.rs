//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and its cache.
use std::sync::Arc;

use crate::platform::ServerPlatform;
use crate::tools::cache::{CacheGetParams, CacheKeysParams, get_impl, keys_impl};
use crate::tools::events::{
    WorkerMessageParams, WorkerNotificationClickParams, WorkerPushParams, WorkerSyncParams, message_impl,
    notification_click_impl, periodic_sync_impl, push_impl, sync_impl,
};
use crate::tools::fetch::{WorkerFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};
use crate::tools::subscribe::{SubscriptionEnqueueParams, enqueue_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::{CacheDb, ServiceWorker};

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct WorkerServer {
    worker: Arc<ServiceWorker>,
    platform: Arc<ServerPlatform>,
    db: CacheDb,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler.
    pub fn new(worker: Arc<ServiceWorker>, platform: Arc<ServerPlatform>, db: CacheDb) -> Self {
        Self { worker, platform, db, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the install event: cache the static manifest (all-or-nothing) and warm content pages.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate event: delete partitions from other versions and claim open clients.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Report lifecycle state, cache partitions, queued subscriptions and platform state.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, &self.platform, &self.db).await
    }

    /// Dispatch a fetch event.
    ///
    /// Static assets are served cache-first, images stale-while-revalidate,
    /// content pages network-first with an offline fallback.
    #[tool(
        description = "Dispatch a fetch event through the worker. Returns the route, where the response came from, and the response."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a message to the worker: SKIP_WAITING, CACHE_UPDATED or CLEANUP_CACHE.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire a background sync event. 'newsletter-subscription' replays queued subscriptions.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Fire a periodic sync event. 'content-update' refreshes the important content pages.")]
    async fn worker_periodic_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        periodic_sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Returns the notification that was shown.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a notification or one of its actions ('explore', 'close').")]
    async fn worker_notification_click(
        &self, params: Parameters<WorkerNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker, &self.platform, params.0).await
    }

    #[tool(description = "List cache partitions and the requests stored in each.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.db, params.0).await
    }

    #[tool(description = "Look up a cached response by URL, in one partition or across all of them.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.db, self.worker.router().origin(), params.0).await
    }

    #[tool(description = "Queue a newsletter subscription made while offline for the next sync.")]
    async fn subscription_enqueue(
        &self, params: Parameters<SubscriptionEnqueueParams>,
    ) -> Result<CallToolResult, McpError> {
        enqueue_impl(&self.db, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline cache worker. Call worker_install then worker_activate before dispatching fetches.".into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let fx = fixture().await;
        let server = WorkerServer::new(fx.worker, fx.platform, fx.db);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_keys",
                "subscription_enqueue",
                "worker_activate",
                "worker_fetch",
                "worker_install",
                "worker_message",
                "worker_notification_click",
                "worker_periodic_sync",
                "worker_push",
                "worker_status",
                "worker_sync",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let fx = fixture().await;
        let server = WorkerServer::new(fx.worker, fx.platform, fx.db);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "swcache");
        assert!(info.capabilities.tools.is_some());
    }
}
