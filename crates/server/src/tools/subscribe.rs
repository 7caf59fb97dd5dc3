//! subscription_enqueue tool implementation.
//!
//! Stores a newsletter submission that could not be sent while offline, to
//! be replayed by the `newsletter-subscription` sync.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, SubscriptionQueue};

use super::json_result;

/// Parameters for the subscription_enqueue tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubscriptionEnqueueParams {
    /// The form submission, posted as JSON on replay.
    pub data: serde_json::Value,
}

/// Output from the subscription_enqueue tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubscriptionEnqueueOutput {
    pub id: i64,
    /// Submissions waiting for the next sync, including this one.
    pub pending: usize,
}

/// Implementation of the subscription_enqueue tool.
pub async fn enqueue_impl(
    queue: &dyn SubscriptionQueue, params: SubscriptionEnqueueParams,
) -> Result<CallToolResult, McpError> {
    if params.data.is_null() {
        return Err(Error::InvalidInput("subscription data must not be null".to_string()).into());
    }

    let id = queue.enqueue(&params.data).await?;
    let pending = queue.pending().await?.len();
    tracing::info!(id, pending, "subscription queued for sync");

    json_result(&SubscriptionEnqueueOutput { id, pending })
}
