//! The cache router.
//!
//! Owns the partitions of one cache version. Decides whether a request is
//! intercepted, classifies it, and runs the matching strategy. Also carries
//! the partition maintenance used by the lifecycle and message handlers:
//!
//! - install-time static precache (all-or-nothing)
//! - install-time content prewarm (best effort, per page)
//! - activate-time pruning of partitions from other versions
//! - retention sweep for `CLEANUP_CACHE`
//! - periodic refresh of important content pages

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::background::BackgroundTasks;
use super::classify::{Classifier, Route};
use crate::Error;
use crate::cache::CacheStorage;
use crate::config::{PartitionNames, WorkerConfig};
use crate::http::{Fetcher, Request, Response};

/// Where a response handed back to the page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// The cached offline page, served for a failed content request.
    OfflinePage,
    /// The synthetic `503` offline response.
    Synthetic,
}

/// A response produced by the router.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub route: Route,
    pub source: ResponseSource,
    pub response: Response,
}

/// Whether the worker takes over a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Not intercepted; the platform performs its default fetch.
    Decline,
    Respond(Routed),
}

/// Request router over the current cache version.
#[derive(Clone)]
pub struct CacheRouter {
    pub(super) config: Arc<WorkerConfig>,
    pub(super) origin: Url,
    pub(super) names: PartitionNames,
    pub(super) offline_page: Request,
    pub(super) classifier: Arc<Classifier>,
    pub(super) storage: Arc<dyn CacheStorage>,
    pub(super) network: Arc<dyn Fetcher>,
    pub(super) background: BackgroundTasks,
}

impl CacheRouter {
    pub fn new(
        config: WorkerConfig, origin: Url, storage: Arc<dyn CacheStorage>, network: Arc<dyn Fetcher>,
    ) -> Result<Self, Error> {
        let classifier = Classifier::new(&config, &origin)?;
        let offline_page = Request::get(resolve(&origin, &config.offline_url)?);
        let names = config.partition_names();

        Ok(Self {
            config: Arc::new(config),
            origin,
            names,
            offline_page,
            classifier: Arc::new(classifier),
            storage,
            network,
            background: BackgroundTasks::default(),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn partition_names(&self) -> &PartitionNames {
        &self.names
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn network(&self) -> &Arc<dyn Fetcher> {
        &self.network
    }

    /// Resolve a site path (or absolute URL) against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        resolve(&self.origin, path)
    }

    /// Wait for every detached cache write and background refresh.
    pub async fn settle(&self) {
        self.background.settle().await;
    }

    /// Whether the request is one the worker intercepts at all.
    pub fn in_scope(&self, request: &Request) -> bool {
        if !request.is_get() {
            return false;
        }
        request.url.origin() == self.origin.origin() || self.is_cdn(&request.url)
    }

    fn is_cdn(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| self.config.cdn_hosts.iter().any(|cdn| host.contains(cdn.as_str())))
    }

    pub fn classify(&self, request: &Request) -> Route {
        self.classifier.classify(request)
    }

    /// Serve a request.
    ///
    /// Only the network-only route can return `Err`; every other strategy
    /// resolves to some response.
    pub async fn handle(&self, request: &Request) -> Result<Interception, Error> {
        if !self.in_scope(request) {
            tracing::debug!(method = %request.method, url = %request.url, "declining request");
            return Ok(Interception::Decline);
        }

        let route = self.classify(request);
        tracing::debug!(url = %request.url, ?route, strategy = route.strategy(), "routing request");

        let (source, response) = match route {
            Route::StaticAsset => self.cache_first(request, &self.names.static_assets).await,
            Route::Image => self.stale_while_revalidate(request, &self.names.images).await,
            Route::ContentPage => self.network_first(request, &self.names.content).await,
            Route::Other => self.network_only(request).await?,
        };

        Ok(Interception::Respond(Routed { route, source, response }))
    }

    /// Fetch every static manifest asset and store them together.
    ///
    /// If any fetch fails or returns a non-2xx status nothing is written and
    /// the whole step fails.
    pub async fn precache_static(&self) -> Result<usize, Error> {
        let partition = &self.names.static_assets;
        self.storage.open(partition).await?;

        let requests = self
            .config
            .static_assets
            .iter()
            .map(|asset| self.resolve(asset).map(Request::get))
            .collect::<Result<Vec<_>, _>>()?;

        let responses = try_join_all(requests.iter().map(|request| async move {
            match self.network.fetch(request).await {
                Ok(response) if response.is_ok() => Ok(response),
                Ok(response) => Err(Error::InstallFailed(format!("{} returned {}", request.url, response.status))),
                Err(e) => Err(Error::InstallFailed(format!("{}: {e}", request.url))),
            }
        }))
        .await?;

        for (request, response) in requests.iter().zip(&responses) {
            self.storage.put(partition, request, response).await?;
        }

        tracing::info!(partition = %partition, count = responses.len(), "static assets cached");
        Ok(responses.len())
    }

    /// Warm the content partition with the configured pages.
    ///
    /// Each page stands alone: failures are logged and skipped.
    pub async fn prewarm_content(&self) -> usize {
        let partition = &self.names.content;
        if let Err(e) = self.storage.open(partition).await {
            tracing::warn!(partition = %partition, error = %e, "could not open content partition");
            return 0;
        }

        let results = join_all(
            self.config
                .precache_pages
                .iter()
                .map(|page| self.fetch_and_store(partition, page)),
        )
        .await;

        let warmed = results.iter().filter(|ok| **ok).count();
        if warmed < results.len() {
            tracing::warn!(warmed, total = results.len(), "some pages failed to cache");
        }
        warmed
    }

    /// Delete every partition not belonging to the current version.
    pub async fn prune_partitions(&self) -> Result<Vec<String>, Error> {
        let stale: Vec<String> = self
            .storage
            .partitions()
            .await?
            .into_iter()
            .filter(|name| !self.names.is_current(name))
            .collect();

        try_join_all(stale.iter().map(|name| self.storage.delete_partition(name))).await?;

        for name in &stale {
            tracing::info!(partition = %name, "deleted stale partition");
        }
        Ok(stale)
    }

    /// Remove entries whose `Date` header is older than the retention window.
    ///
    /// Covers every partition in storage. Entries without a parseable date
    /// are kept.
    pub async fn cleanup_expired(&self) -> Result<usize, Error> {
        let now = chrono::Utc::now();
        let retention = self.config.retention()?;
        let mut removed = 0;

        for partition in self.storage.partitions().await? {
            for request in self.storage.requests(&partition).await? {
                let Some(response) = self.storage.lookup(&partition, &request).await? else {
                    continue;
                };
                let Some(date) = response.date() else {
                    continue;
                };
                if now.signed_duration_since(date) > retention && self.storage.delete(&partition, &request).await? {
                    tracing::debug!(partition = %partition, url = %request.url, %date, "expired entry removed");
                    removed += 1;
                }
            }
        }

        tracing::info!(removed, "cache cleanup finished");
        Ok(removed)
    }

    /// Re-fetch the refresh pages and overwrite their content entries.
    ///
    /// Pages are processed one after another; one page failing never stops
    /// the rest.
    pub async fn refresh_content(&self) -> usize {
        let partition = &self.names.content;
        let mut refreshed = 0;

        for page in &self.config.refresh_pages {
            if self.fetch_and_store(partition, page).await {
                tracing::info!(page = %page, "content cache updated");
                refreshed += 1;
            }
        }

        refreshed
    }

    async fn fetch_and_store(&self, partition: &str, page: &str) -> bool {
        let request = match self.resolve(page) {
            Ok(url) => Request::get(url),
            Err(e) => {
                tracing::warn!(page = %page, error = %e, "skipping unresolvable page");
                return false;
            }
        };

        match self.network.fetch(&request).await {
            Ok(response) if response.is_ok() => match self.storage.put(partition, &request, &response).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "failed to store page");
                    false
                }
            },
            Ok(response) => {
                tracing::warn!(url = %request.url, status = response.status, "page not cached");
                false
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "failed to fetch page");
                false
            }
        }
    }
}

fn resolve(origin: &Url, path: &str) -> Result<Url, Error> {
    origin.join(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ORIGIN, router_with};

    fn small_config() -> WorkerConfig {
        WorkerConfig {
            static_assets: vec!["/a.css".into(), "/b.js".into()],
            precache_pages: vec!["/blog/".into(), "/blog/ia/".into(), "/blog/offline.html".into()],
            refresh_pages: vec!["/blog/".into(), "/blog/ia/".into()],
            ..Default::default()
        }
    }

    fn url(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse(&url(path)).unwrap())
    }

    #[tokio::test]
    async fn test_scope_gate() {
        let (router, _, _) = router_with(small_config()).await;

        assert!(router.in_scope(&get("/blog/")));
        assert!(router.in_scope(&Request::get(Url::parse("https://fonts.gstatic.com/s/inter.woff2").unwrap())));
        assert!(!router.in_scope(&Request::get(Url::parse("https://evil.example.org/x.js").unwrap())));
        assert!(!router.in_scope(&Request::get(Url::parse("http://example.com/blog/").unwrap())));

        let mut post = get("/blog/");
        post.method = "POST".into();
        assert!(!router.in_scope(&post));
    }

    #[tokio::test]
    async fn test_non_get_is_declined_without_network() {
        let (router, _, network) = router_with(small_config()).await;
        let mut post = get("/blog/api/subscribe");
        post.method = "POST".into();

        assert_eq!(router.handle(&post).await.unwrap(), Interception::Decline);
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_origin_is_declined() {
        let (router, _, network) = router_with(small_config()).await;
        let req = Request::get(Url::parse("https://tracker.example.net/pixel.gif").unwrap());

        assert_eq!(router.handle(&req).await.unwrap(), Interception::Decline);
        assert!(network.calls().is_empty());
    }

    #[tokio::test]
    async fn test_precache_static_success() {
        let (router, db, network) = router_with(small_config()).await;
        network.respond(&url("/a.css"), Response::new(200, "a"));
        network.respond(&url("/b.js"), Response::new(200, "b"));

        assert_eq!(router.precache_static().await.unwrap(), 2);

        let partition = &router.partition_names().static_assets;
        assert_eq!(db.lookup(partition, &get("/a.css")).await.unwrap().unwrap().text(), "a");
        assert_eq!(db.lookup(partition, &get("/b.js")).await.unwrap().unwrap().text(), "b");
    }

    #[tokio::test]
    async fn test_precache_static_is_all_or_nothing() {
        let (router, db, network) = router_with(small_config()).await;
        network.respond(&url("/a.css"), Response::new(200, "a"));
        network.fail(&url("/b.js"));

        let err = router.precache_static().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed(msg) if msg.contains("/b.js")));

        let partition = &router.partition_names().static_assets;
        assert!(db.requests(partition).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_precache_static_rejects_error_status() {
        let (router, _, network) = router_with(small_config()).await;
        network.respond(&url("/a.css"), Response::new(200, "a"));
        network.respond(&url("/b.js"), Response::new(404, "missing"));

        assert!(matches!(router.precache_static().await, Err(Error::InstallFailed(_))));
    }

    #[tokio::test]
    async fn test_prewarm_content_is_best_effort() {
        let (router, db, network) = router_with(small_config()).await;
        network.respond(&url("/blog/"), Response::new(200, "home"));
        network.fail(&url("/blog/ia/"));
        network.respond(&url("/blog/offline.html"), Response::new(200, "offline"));

        assert_eq!(router.prewarm_content().await, 2);

        let partition = &router.partition_names().content;
        assert!(db.lookup(partition, &get("/blog/")).await.unwrap().is_some());
        assert!(db.lookup(partition, &get("/blog/ia/")).await.unwrap().is_none());
        assert!(db.lookup(partition, &get("/blog/offline.html")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prune_partitions() {
        let (router, db, _) = router_with(small_config()).await;
        let names = router.partition_names().clone();
        for name in [&names.static_assets, &names.content, &names.images, &names.umbrella] {
            db.open(name).await.unwrap();
        }
        db.put("nachoweb3-static-v0.9.0", &get("/a.css"), &Response::new(200, "old")).await.unwrap();

        let mut deleted = router.prune_partitions().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["nachoweb3-static-v0.9.0".to_string(), names.umbrella.clone()]);

        let mut remaining = db.partitions().await.unwrap();
        remaining.sort();
        let mut expected: Vec<String> = names.current().iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (router, db, _) = router_with(small_config()).await;
        let now = chrono::Utc::now();
        let old = Response::new(200, "old").with_header("date", &(now - chrono::Duration::days(8)).to_rfc2822());
        let fresh = Response::new(200, "fresh").with_header("date", &(now - chrono::Duration::days(6)).to_rfc2822());
        let undated = Response::new(200, "undated");
        let garbage = Response::new(200, "garbage").with_header("date", "not a date");

        db.put("nachoweb3-content-v1.0.0", &get("/blog/old"), &old).await.unwrap();
        db.put("nachoweb3-content-v1.0.0", &get("/blog/fresh"), &fresh).await.unwrap();
        db.put("nachoweb3-images-v1.0.0", &get("/x.png"), &undated).await.unwrap();
        db.put("legacy", &get("/legacy-old"), &old).await.unwrap();
        db.put("legacy", &get("/legacy-garbage"), &garbage).await.unwrap();

        assert_eq!(router.cleanup_expired().await.unwrap(), 2);

        assert!(db.lookup("nachoweb3-content-v1.0.0", &get("/blog/old")).await.unwrap().is_none());
        assert!(db.lookup("nachoweb3-content-v1.0.0", &get("/blog/fresh")).await.unwrap().is_some());
        assert!(db.lookup("nachoweb3-images-v1.0.0", &get("/x.png")).await.unwrap().is_some());
        assert!(db.lookup("legacy", &get("/legacy-old")).await.unwrap().is_none());
        assert!(db.lookup("legacy", &get("/legacy-garbage")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_rejects_unrepresentable_retention() {
        let config = WorkerConfig { retention_days: 200_000_000_000, ..small_config() };
        let (router, db, _) = router_with(config).await;
        let old = Response::new(200, "old").with_header("date", "Mon, 01 Jan 2001 00:00:00 GMT");
        db.put("nachoweb3-content-v1.0.0", &get("/blog/old"), &old).await.unwrap();

        let err = router.cleanup_expired().await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(db.lookup("nachoweb3-content-v1.0.0", &get("/blog/old")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refresh_content_isolates_failures() {
        let (router, db, network) = router_with(small_config()).await;
        let partition = router.partition_names().content.clone();
        db.put(&partition, &get("/blog/"), &Response::new(200, "stale home")).await.unwrap();

        network.fail(&url("/blog/"));
        network.respond(&url("/blog/ia/"), Response::new(200, "ia v2"));

        assert_eq!(router.refresh_content().await, 1);
        assert_eq!(network.calls().len(), 2);
        assert_eq!(db.lookup(&partition, &get("/blog/")).await.unwrap().unwrap().text(), "stale home");
        assert_eq!(db.lookup(&partition, &get("/blog/ia/")).await.unwrap().unwrap().text(), "ia v2");
    }
}
