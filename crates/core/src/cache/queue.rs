//! Offline newsletter subscription queue.
//!
//! Form submissions made while offline are queued here and replayed by the
//! `newsletter-subscription` background sync.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A queued form submission awaiting delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueuedSubscription {
    pub id: i64,
    pub data: serde_json::Value,
    pub queued_at: String,
}

/// Storage for submissions made while offline.
#[async_trait::async_trait]
pub trait SubscriptionQueue: Send + Sync {
    /// Queue a submission; returns its id.
    async fn enqueue(&self, data: &serde_json::Value) -> Result<i64, Error>;

    /// Every queued submission, oldest first.
    async fn pending(&self) -> Result<Vec<QueuedSubscription>, Error>;

    /// Drop a delivered submission.
    async fn remove(&self, id: i64) -> Result<bool, Error>;
}

#[async_trait::async_trait]
impl SubscriptionQueue for CacheDb {
    async fn enqueue(&self, data: &serde_json::Value) -> Result<i64, Error> {
        let payload = serde_json::to_string(data)?;
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO subscription_queue (payload_json, queued_at) VALUES (?1, ?2)",
                    params![payload, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    async fn pending(&self) -> Result<Vec<QueuedSubscription>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(i64, String, String)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT id, payload_json, queued_at FROM subscription_queue ORDER BY id ASC")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(id, payload, queued_at)| {
                Ok(QueuedSubscription { id, data: serde_json::from_str(&payload)?, queued_at })
            })
            .collect()
    }

    async fn remove(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM subscription_queue WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
