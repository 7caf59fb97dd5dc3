//! Background sync: replaying offline newsletter subscriptions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::SubscriptionQueue;
use crate::http::{Fetcher, Request};

/// One-off sync tag that replays queued newsletter subscriptions.
pub const NEWSLETTER_SYNC_TAG: &str = "newsletter-subscription";

/// Periodic sync tag that refreshes the important content pages.
pub const CONTENT_UPDATE_TAG: &str = "content-update";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// POST every queued submission to `endpoint`, oldest first.
///
/// Delivered items (2xx) are removed. Anything else stays queued for the
/// next sync; per-item failures never abort the batch.
pub async fn replay_subscriptions(
    queue: &dyn SubscriptionQueue, network: &dyn Fetcher, endpoint: &Url,
) -> Result<SyncReport, Error> {
    let pending = queue.pending().await?;
    let mut report = SyncReport::default();

    for item in pending {
        report.attempted += 1;

        let request = Request::post_json(endpoint.clone(), &item.data)?;
        match network.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                if let Err(e) = queue.remove(item.id).await {
                    tracing::warn!(id = item.id, error = %e, "delivered subscription could not be dequeued");
                }
                report.delivered += 1;
            }
            Ok(response) => {
                tracing::warn!(id = item.id, status = response.status, "subscription rejected; keeping it queued");
            }
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "failed to sync subscription");
            }
        }
    }

    tracing::info!(attempted = report.attempted, delivered = report.delivered, "subscription sync finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheDb;
    use crate::http::Response;
    use crate::testing::StubFetcher;
    use serde_json::json;

    fn endpoint() -> Url {
        Url::parse("https://example.com/blog/api/subscribe").unwrap()
    }

    #[tokio::test]
    async fn test_replay_delivers_and_dequeues() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue(&json!({"email": "a@example.com"})).await.unwrap();
        db.enqueue(&json!({"email": "b@example.com"})).await.unwrap();

        let network = StubFetcher::new();
        network.respond(endpoint().as_str(), Response::new(201, "{}"));

        let report = replay_subscriptions(&db, &network, &endpoint()).await.unwrap();
        assert_eq!(report, SyncReport { attempted: 2, delivered: 2 });
        assert!(db.pending().await.unwrap().is_empty());

        let calls = network.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].body.as_deref(), Some(br#"{"email":"a@example.com"}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_replay_keeps_failed_items() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.enqueue(&json!({"email": "a@example.com"})).await.unwrap();

        let network = StubFetcher::new();
        network.fail(endpoint().as_str());

        let report = replay_subscriptions(&db, &network, &endpoint()).await.unwrap();
        assert_eq!(report, SyncReport { attempted: 1, delivered: 0 });
        assert_eq!(db.pending().await.unwrap().len(), 1);

        network.respond(endpoint().as_str(), Response::new(500, "down"));
        let report = replay_subscriptions(&db, &network, &endpoint()).await.unwrap();
        assert_eq!(report.delivered, 0);
        assert_eq!(db.pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replay_empty_queue() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = StubFetcher::new();
        let report = replay_subscriptions(&db, &network, &endpoint()).await.unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(network.calls().is_empty());
    }
}
