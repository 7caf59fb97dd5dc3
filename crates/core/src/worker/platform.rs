//! The hosting platform as seen from inside the worker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::push::Notification;
use crate::Error;

/// An open page controlled (or controllable) by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// Capabilities the worker needs from its host.
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Let a waiting worker version activate without waiting for pages to close.
    async fn skip_waiting(&self);

    /// Take control of every open page.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn clients(&self) -> Result<Vec<WindowClient>, Error>;

    async fn focus(&self, client: &WindowClient) -> Result<(), Error>;

    async fn open_window(&self, url: &str) -> Result<(), Error>;
}
