//! The four caching strategies.
//!
//! | Strategy               | Used for        | On network failure                        |
//! |------------------------|-----------------|-------------------------------------------|
//! | cache-first            | static assets   | synthetic 503                             |
//! | network-first          | content pages   | cached entry, offline page, synthetic 503 |
//! | stale-while-revalidate | images          | cached entry, else synthetic 503          |
//! | network-only           | everything else | error returned to the caller              |
//!
//! Cache writes are detached: the response goes back to the page without
//! waiting for the write to land.

use super::router::{CacheRouter, ResponseSource};
use crate::Error;
use crate::http::{Request, Response};

impl CacheRouter {
    pub(super) async fn cache_first(&self, request: &Request, partition: &str) -> (ResponseSource, Response) {
        if let Some(cached) = self.cached(partition, request).await {
            tracing::debug!(url = %request.url, "serving from cache");
            return (ResponseSource::Cache, cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_detached(partition, request, &response);
                }
                (ResponseSource::Network, response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed, serving offline response");
                (ResponseSource::Synthetic, Response::offline())
            }
        }
    }

    pub(super) async fn network_first(&self, request: &Request, partition: &str) -> (ResponseSource, Response) {
        let error = match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_detached(partition, request, &response);
                }
                return (ResponseSource::Network, response);
            }
            Err(e) => e,
        };

        tracing::info!(url = %request.url, error = %error, "network failed, checking cache");

        if let Some(cached) = self.cached(partition, request).await {
            return (ResponseSource::Cache, cached);
        }

        if let Some(page) = self.cached(partition, &self.offline_page).await {
            tracing::debug!(url = %request.url, offline = %self.offline_page.url, "serving offline page");
            return (ResponseSource::OfflinePage, page);
        }

        (ResponseSource::Synthetic, Response::offline())
    }

    pub(super) async fn stale_while_revalidate(&self, request: &Request, partition: &str) -> (ResponseSource, Response) {
        if let Some(cached) = self.cached(partition, request).await {
            tracing::debug!(url = %request.url, "serving stale image");
            self.revalidate_detached(partition, request);
            return (ResponseSource::Cache, cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_detached(partition, request, &response);
                }
                (ResponseSource::Network, response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "image fetch failed with nothing cached");
                (ResponseSource::Synthetic, Response::offline())
            }
        }
    }

    pub(super) async fn network_only(&self, request: &Request) -> Result<(ResponseSource, Response), Error> {
        match self.network.fetch(request).await {
            Ok(response) => Ok((ResponseSource::Network, response)),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network request failed");
                Err(e)
            }
        }
    }

    /// Cache lookup where a storage failure counts as a miss.
    async fn cached(&self, partition: &str, request: &Request) -> Option<Response> {
        match self.storage.lookup(partition, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition = %partition, url = %request.url, error = %e, "cache read failed");
                None
            }
        }
    }

    fn store_detached(&self, partition: &str, request: &Request, response: &Response) {
        let storage = self.storage.clone();
        let partition = partition.to_string();
        let request = request.clone();
        let response = response.clone();

        self.background.spawn(async move {
            if let Err(e) = storage.put(&partition, &request, &response).await {
                tracing::warn!(partition = %partition, url = %request.url, error = %e, "cache write failed");
            }
        });
    }

    fn revalidate_detached(&self, partition: &str, request: &Request) {
        let storage = self.storage.clone();
        let network = self.network.clone();
        let partition = partition.to_string();
        let request = request.clone();

        self.background.spawn(async move {
            match network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    if let Err(e) = storage.put(&partition, &request, &response).await {
                        tracing::warn!(url = %request.url, error = %e, "revalidated image not stored");
                    }
                }
                Ok(response) => {
                    tracing::debug!(url = %request.url, status = response.status, "revalidation kept stale image");
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "background image fetch failed");
                }
            }
        });
    }
}
