//! cache_get tool implementation.
//!
//! Looks up a cached response by request URL, either in one partition or
//! across all of them in creation order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStorage, Error, Request};
use url::Url;

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Path relative to the site origin, or an absolute URL.
    pub url: String,

    /// Partition to search (default: all partitions).
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Partition the entry was found in.
    pub partition: String,
    pub url: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    storage: &dyn CacheStorage, origin: &Url, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = swcache_client::resolve(&params.url, origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);

    let partitions = match params.partition {
        Some(name) => vec![name],
        None => storage.partitions().await?,
    };

    for partition in partitions {
        if let Some(response) = storage.lookup(&partition, &request).await? {
            let output =
                CacheGetOutput { partition, url: request.url.to_string(), response: ResponseView::from(&response) };
            return json_result(&output);
        }
    }

    Err(Error::CacheMiss(request.url.to_string()).into())
}
