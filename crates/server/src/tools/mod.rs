//! MCP tool implementations.
//!
//! This module contains all tools exposed by the swcache server. Each tool
//! drives one worker event or inspects the cache it maintains.

pub mod cache;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod subscribe;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Error, Headers, Response};

/// A response as reported back to MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    /// Body as UTF-8, absent for binary bodies.
    pub body: Option<String>,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: String::from_utf8(response.body.clone()).ok(),
            body_bytes: response.body.len(),
        }
    }
}

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
