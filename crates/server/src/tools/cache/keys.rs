//! cache_keys tool implementation.
//!
//! Lists cache partitions and the requests stored in each.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheStorage, Error};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Restrict the listing to one partition.
    #[serde(default)]
    pub partition: Option<String>,
}

/// One stored request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CacheKey {
    pub method: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PartitionKeys {
    pub name: String,
    pub keys: Vec<CacheKey>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub partitions: Vec<PartitionKeys>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(storage: &dyn CacheStorage, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let existing = storage.partitions().await?;

    let names = match params.partition {
        Some(name) if existing.contains(&name) => vec![name],
        Some(name) => return Err(Error::CacheMiss(format!("no partition named {name}")).into()),
        None => existing,
    };

    let mut partitions = Vec::with_capacity(names.len());
    for name in names {
        let keys = storage
            .requests(&name)
            .await?
            .into_iter()
            .map(|request| CacheKey { method: request.method, url: request.url.to_string() })
            .collect();
        partitions.push(PartitionKeys { name, keys });
    }

    json_result(&CacheKeysOutput { partitions })
}
