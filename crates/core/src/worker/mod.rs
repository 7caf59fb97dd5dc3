//! The offline worker.
//!
//! A [`ServiceWorker`] receives platform events (install, activate, fetch,
//! message, sync, periodic sync, push, notification click) and drives a
//! [`CacheRouter`] through its lifecycle:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               \
//!                -> Redundant (static precache failed)
//! ```
//!
//! Fetch events are only intercepted once the worker is `Activated`.

pub mod background;
pub mod classify;
pub mod message;
pub mod platform;
pub mod push;
pub mod router;
pub mod strategy;
pub mod sync;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::cache::SubscriptionQueue;
use crate::http::Request;

pub use classify::{Classifier, Route};
pub use message::{MessageOutcome, WorkerMessage};
pub use platform::{Platform, WindowClient};
pub use push::{ClickOutcome, Notification, NotificationAction};
pub use router::{CacheRouter, Interception, ResponseSource, Routed};
pub use sync::{CONTENT_UPDATE_TAG, NEWSLETTER_SYNC_TAG, SyncReport};

use push::ClickAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Summary of a successful install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub static_cached: usize,
    pub pages_warmed: usize,
}

/// One worker instance bound to one cache version.
pub struct ServiceWorker {
    router: CacheRouter,
    platform: Arc<dyn Platform>,
    queue: Arc<dyn SubscriptionQueue>,
    state: RwLock<WorkerState>,
}

impl ServiceWorker {
    pub fn new(router: CacheRouter, platform: Arc<dyn Platform>, queue: Arc<dyn SubscriptionQueue>) -> Self {
        tracing::info!(version = %router.config().cache_version, "worker loaded");
        Self { router, platform, queue, state: RwLock::new(WorkerState::Parsed) }
    }

    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidState(format!("cannot move to {to:?} from {:?}", *state)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    /// Handle the `install` event.
    ///
    /// The static manifest must cache completely or the worker becomes
    /// redundant. Content pages are warmed on a best-effort basis.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing).await?;
        tracing::info!("install event");

        let static_cached = match self.router.precache_static().await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "install failed; worker is redundant");
                self.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        };

        let pages_warmed = self.router.prewarm_content().await;

        self.set_state(WorkerState::Installed).await;
        self.platform.skip_waiting().await;

        tracing::info!(static_cached, pages_warmed, "static assets cached");
        Ok(InstallReport { static_cached, pages_warmed })
    }

    /// Handle the `activate` event: prune stale partitions, then claim clients.
    ///
    /// Returns the names of the deleted partitions. On failure the worker
    /// stays `Installed` so activation can be retried.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;
        tracing::info!("activate event");

        let activated = async {
            let pruned = self.router.prune_partitions().await?;
            self.platform.claim_clients().await?;
            Ok::<_, Error>(pruned)
        }
        .await;

        match activated {
            Ok(pruned) => {
                self.set_state(WorkerState::Activated).await;
                tracing::info!(pruned = pruned.len(), "activation complete");
                Ok(pruned)
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed");
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    /// Handle a `fetch` event.
    pub async fn fetch(&self, request: &Request) -> Result<Interception, Error> {
        if self.state().await != WorkerState::Activated {
            tracing::debug!(url = %request.url, "worker not active; declining");
            return Ok(Interception::Decline);
        }
        self.router.handle(request).await
    }

    /// Handle a `message` event from a page.
    pub async fn message(&self, raw: &serde_json::Value) -> Result<MessageOutcome, Error> {
        tracing::info!(message = %raw, "message received");

        let Some(message) = WorkerMessage::parse(raw) else {
            tracing::debug!("unrecognised message ignored");
            return Ok(MessageOutcome::Ignored);
        };

        match message {
            WorkerMessage::SkipWaiting => {
                self.platform.skip_waiting().await;
                Ok(MessageOutcome::SkipWaiting)
            }
            WorkerMessage::CacheUpdated => {
                tracing::info!("client notified of cache update");
                Ok(MessageOutcome::Acknowledged)
            }
            WorkerMessage::CleanupCache => {
                let removed = self.router.cleanup_expired().await?;
                Ok(MessageOutcome::CleanedUp { removed })
            }
        }
    }

    /// Handle a one-off `sync` event. Unknown tags yield `None`.
    pub async fn sync(&self, tag: &str) -> Result<Option<SyncReport>, Error> {
        tracing::info!(tag, "background sync event");

        if tag != NEWSLETTER_SYNC_TAG {
            return Ok(None);
        }

        let endpoint = self.router.resolve(&self.router.config().subscribe_endpoint)?;
        let report = sync::replay_subscriptions(self.queue.as_ref(), self.router.network().as_ref(), &endpoint).await?;
        Ok(Some(report))
    }

    /// Handle a `periodicsync` event. Returns the pages refreshed, or `None`
    /// for unknown tags.
    pub async fn periodic_sync(&self, tag: &str) -> Option<usize> {
        tracing::info!(tag, "periodic sync event");

        if tag != CONTENT_UPDATE_TAG {
            return None;
        }
        Some(self.router.refresh_content().await)
    }

    /// Handle a `push` event by showing a notification.
    pub async fn push(&self, payload: Option<&[u8]>) -> Result<Notification, Error> {
        tracing::info!("push event received");

        let config = self.router.config();
        let notification = Notification::from_push(&config.notification, &config.blog_root, payload);
        self.platform.show_notification(&notification).await?;
        Ok(notification)
    }

    /// Handle a `notificationclick` event.
    pub async fn notification_click(
        &self, action: Option<&str>, notification: &Notification,
    ) -> Result<ClickOutcome, Error> {
        tracing::info!(action = action.unwrap_or("default"), "notification clicked");

        let target = notification
            .target_url()
            .unwrap_or(&self.router.config().blog_root)
            .to_string();

        match ClickAction::from_action(action) {
            ClickAction::Close => Ok(ClickOutcome::Dismissed),
            ClickAction::Explore => {
                self.platform.open_window(&target).await?;
                Ok(ClickOutcome::Opened(target))
            }
            ClickAction::Default => {
                let clients = self.platform.clients().await?;
                if let Some(client) = clients.iter().find(|c| c.focusable && c.url == target) {
                    self.platform.focus(client).await?;
                    return Ok(ClickOutcome::Focused(client.id.clone()));
                }
                self.platform.open_window(&target).await?;
                Ok(ClickOutcome::Opened(target))
            }
        }
    }
}
