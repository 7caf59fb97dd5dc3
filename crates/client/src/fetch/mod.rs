//! HTTP fetch pipeline backing the worker's network access.
//!
//! ### Semantics
//! - Every status is a response; only transport failures are errors
//! - Request method, headers and body are forwarded as-is
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable), enforced while streaming

pub mod url;

use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve};

use swcache_core::config::AppConfig;
use swcache_core::{Error, Fetcher, Headers, Request, Response};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// reqwest-backed network for the worker.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn transport_error(&self, url: &::url::Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{} after {:?}", url, self.config.timeout))
        } else {
            Error::Network(format!("{}: {}", url, err))
        }
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait::async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("unsupported method: {}", request.method)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let mut response = builder.send().await.map_err(|e| self.transport_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else { continue };
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(&request.url, e))? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(self.too_large(body.len() + chunk.len()));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = status.as_u16(),
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(raw: &'static str) -> (::url::Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(raw.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (::url::Url::parse(&format!("http://{}/blog/post-1", addr)).unwrap(), handle)
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), max_bytes: 1024, timeout_ms: 500, ..AppConfig::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_returns_error_statuses_as_responses() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\nnope",
        )
        .await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let response = client.fetch(&Request::get(url)).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.status_text, "Not Found");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.body, b"nope");
        assert!(!response.is_ok());

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /blog/post-1 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_forwards_method_and_body() {
        let (url, server) =
            serve_once("HTTP/1.1 201 Created\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}").await;
        let client = FetchClient::new(FetchConfig::default()).unwrap();

        let payload = std::collections::BTreeMap::from([("email", "a@example.com")]);
        let request = Request::post_json(url, &payload).unwrap();
        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, 201);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /blog/post-1 HTTP/1.1"));
        assert!(raw.to_lowercase().contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_body() {
        let (url, _server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 32\r\nConnection: close\r\n\r\n0123456789abcdef0123456789abcdef",
        )
        .await;
        let client = FetchClient::new(FetchConfig { max_bytes: 16, ..FetchConfig::default() }).unwrap();

        let result = client.fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = ::url::Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = client.fetch(&Request::get(url)).await.unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, Error::Network(_)));
    }
}
