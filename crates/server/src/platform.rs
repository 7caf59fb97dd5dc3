//! Host platform for the MCP server.
//!
//! There are no real browser pages behind the server, so window clients,
//! focus and notifications are recorded in memory and reported through
//! `worker_status`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::Error;
use swcache_core::worker::{Notification, Platform, WindowClient};
use tokio::sync::Mutex;

/// Everything the worker has asked of its host so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlatformSnapshot {
    /// Times `skipWaiting` was requested.
    pub skip_waiting_requests: usize,
    /// Whether the worker has claimed the open clients.
    pub controlling: bool,
    /// Open window clients.
    pub clients: Vec<WindowClient>,
    /// Id of the most recently focused client.
    pub focused: Option<String>,
    /// Notifications shown, oldest first.
    pub notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct ServerPlatform {
    state: Mutex<PlatformSnapshot>,
}

impl ServerPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> PlatformSnapshot {
        self.state.lock().await.clone()
    }

    /// The most recently shown notification, if any.
    pub async fn last_notification(&self) -> Option<Notification> {
        self.state.lock().await.notifications.last().cloned()
    }
}

#[async_trait::async_trait]
impl Platform for ServerPlatform {
    async fn skip_waiting(&self) {
        self.state.lock().await.skip_waiting_requests += 1;
        tracing::debug!("skip waiting requested");
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        state.controlling = true;
        tracing::info!(clients = state.clients.len(), "clients claimed");
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(title = %notification.title, "showing notification");
        self.state.lock().await.notifications.push(notification.clone());
        Ok(())
    }

    async fn clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.state.lock().await.clients.clone())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        if !state.clients.iter().any(|c| c.id == client.id) {
            return Err(Error::InvalidInput(format!("unknown client: {}", client.id)));
        }
        state.focused = Some(client.id.clone());
        tracing::info!(client = %client.id, url = %client.url, "client focused");
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        let id = format!("window-{}", state.clients.len() + 1);
        tracing::info!(client = %id, url, "window opened");
        state.clients.push(WindowClient { id: id.clone(), url: url.to_string(), focusable: true });
        state.focused = Some(id);
        Ok(())
    }
}
