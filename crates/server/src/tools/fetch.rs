//! worker_fetch tool implementation.
//!
//! Dispatches a request through the worker's `fetch` event, the same path a
//! page navigation or subresource load would take.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::ResponseSource;
use swcache_core::{Error, Headers, Interception, Request, Route, ServiceWorker};

use super::{ResponseView, json_result};

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Path relative to the site origin, or an absolute URL.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers, e.g. `{"accept": "text/html"}`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// False when the worker declined and the request goes straight to the network.
    pub intercepted: bool,
    pub route: Option<Route>,
    pub source: Option<ResponseSource>,
    pub response: Option<ResponseView>,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let url = swcache_client::resolve(&params.url, worker.router().origin())
        .map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let headers: Headers = params
        .headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value))
        .collect();

    let request = Request {
        method: params.method.to_ascii_uppercase(),
        url,
        headers,
        body: params.body.map(String::into_bytes),
    };

    let output = match worker.fetch(&request).await? {
        Interception::Decline => WorkerFetchOutput {
            url: request.url.to_string(),
            intercepted: false,
            route: None,
            source: None,
            response: None,
        },
        Interception::Respond(routed) => WorkerFetchOutput {
            url: request.url.to_string(),
            intercepted: true,
            route: Some(routed.route),
            source: Some(routed.source),
            response: Some(ResponseView::from(&routed.response)),
        },
    };

    json_result(&output)
}
