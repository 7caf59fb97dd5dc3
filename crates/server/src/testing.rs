//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use swcache_core::config::WorkerConfig;
use swcache_core::{CacheDb, CacheRouter, Error, Fetcher, Request, Response, ServiceWorker};

use crate::platform::ServerPlatform;

pub const ORIGIN: &str = "https://example.com";

/// Network answering from a fixed table; anything else is unreachable.
#[derive(Default)]
pub struct ScriptedNetwork {
    replies: Mutex<HashMap<String, Response>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, path: &str, response: Response) {
        self.replies.lock().unwrap().insert(format!("{ORIGIN}{path}"), response);
    }

    pub fn clear(&self) {
        self.replies.lock().unwrap().clear();
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.replies
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
    }
}

pub struct Fixture {
    pub worker: Arc<ServiceWorker>,
    pub platform: Arc<ServerPlatform>,
    pub db: CacheDb,
    pub network: Arc<ScriptedNetwork>,
}

/// A worker over an in-memory cache with a two-asset manifest.
pub async fn fixture() -> Fixture {
    let config = WorkerConfig {
        static_assets: vec!["/blog/app.css".into(), "/blog/app.js".into()],
        precache_pages: vec!["/blog/".into(), "/blog/offline.html".into()],
        refresh_pages: vec!["/blog/".into()],
        ..WorkerConfig::default()
    };

    let db = CacheDb::open_in_memory().await.unwrap();
    let network = Arc::new(ScriptedNetwork::default());
    let platform = Arc::new(ServerPlatform::new());
    let router =
        CacheRouter::new(config, url::Url::parse(ORIGIN).unwrap(), Arc::new(db.clone()), network.clone()).unwrap();
    let worker = Arc::new(ServiceWorker::new(router, platform.clone(), Arc::new(db.clone())));

    Fixture { worker, platform, db, network }
}

/// Script every asset and page the fixture installs with.
pub fn script_site(network: &ScriptedNetwork) {
    network.respond("/blog/app.css", Response::new(200, "body{}").with_header("content-type", "text/css"));
    network.respond("/blog/app.js", Response::new(200, "init()").with_header("content-type", "text/javascript"));
    network.respond("/blog/", Response::new(200, "<h1>home</h1>").with_header("content-type", "text/html"));
    network.respond(
        "/blog/offline.html",
        Response::new(200, "<h1>offline</h1>").with_header("content-type", "text/html"),
    );
}

/// A fixture that has been installed and activated.
pub async fn active_fixture() -> Fixture {
    let fixture = fixture().await;
    script_site(&fixture.network);
    fixture.worker.install().await.unwrap();
    fixture.worker.activate().await.unwrap();
    fixture.worker.router().settle().await;
    fixture
}

/// Decode the JSON text payload of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
