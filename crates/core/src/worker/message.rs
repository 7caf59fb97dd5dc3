//! Page → worker message protocol.
//!
//! Messages are JSON objects with a `type` field.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A recognised client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate the waiting version immediately.
    SkipWaiting,
    /// A page reports that it changed cached content.
    CacheUpdated,
    /// Sweep entries older than the retention window.
    CleanupCache,
}

impl WorkerMessage {
    /// Parse a raw message. Unknown or malformed payloads yield `None`.
    pub fn parse(raw: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(raw.clone()).ok()
    }
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    SkipWaiting,
    Acknowledged,
    CleanedUp { removed: usize },
    Ignored,
}
