//! Request and response model shared by the worker, the cache and the network.
//!
//! Header names are stored lowercased so lookups are case-insensitive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Ordered header map with lowercased names.
pub type Headers = BTreeMap<String, String>;

/// Body of the synthetic response served when nothing usable is available.
pub const OFFLINE_BODY: &str = "Offline - Content not available";

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: Url,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// A bare GET request.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Headers::new(), body: None }
    }

    /// A POST request carrying a JSON body.
    pub fn post_json<T: Serialize>(url: Url, payload: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(payload)?;
        Ok(Self { method: "POST".into(), url, headers: Headers::new(), body: Some(body) }
            .with_header("content-type", "application/json"))
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the `Accept` header asks for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }
}

/// A captured response: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: reason_phrase(status).to_string(), headers: Headers::new(), body: body.into() }
    }

    /// The synthetic `503` returned when both network and cache are unavailable.
    pub fn offline() -> Self {
        Self::new(503, OFFLINE_BODY).with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Status in the 200..=299 range.
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// The `Date` header, if present and parseable as an HTTP-date.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        let raw = self.header("date")?;
        DateTime::parse_from_rfc2822(raw.trim()).ok().map(|d| d.with_timezone(&Utc))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Network seam used by every strategy.
///
/// `Err` means no response was obtained at all. Any HTTP status,
/// including 4xx and 5xx, is returned as `Ok`.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
