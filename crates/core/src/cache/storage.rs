//! Named cache partitions.
//!
//! `CacheStorage` is the registry the worker routes against. Each partition
//! is an independent request→response map; writes to the same key are
//! last-write-wins and no cross-entry transaction is offered.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::http::{Headers, Request, Response};
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Partition registry used by the worker.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it does not exist yet.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Names of every existing partition, oldest first.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all of its entries. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    /// Find the stored response for a request.
    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Store a response for a request, creating the partition on demand.
    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Remove the entry for a request. Returns whether one was removed.
    async fn delete(&self, partition: &str, request: &Request) -> Result<bool, Error>;

    /// The request keys stored in a partition, in insertion order.
    async fn requests(&self, partition: &str) -> Result<Vec<Request>, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![partition, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM partitions WHERE name = ?1", params![partition])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        let partition = partition.to_string();
        let key = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, status_text, headers_json, body
                     FROM entries WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                    |row| {
                        Ok((
                            row.get::<_, u16>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((status, status_text, headers_json, body)) => {
                        let headers: Headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { status, status_text, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = compute_cache_key(&request.method, request.url.as_str());
        let method = request.method.to_ascii_uppercase();
        let url = request.url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![&partition, &now],
                )?;
                conn.execute(
                    "INSERT INTO entries (
                    partition, key, method, url, status, status_text, headers_json, body, stored_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(partition, key) DO UPDATE SET
                    status = excluded.status,
                    status_text = excluded.status_text,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at",
                    params![
                        &partition,
                        &key,
                        &method,
                        &url,
                        response.status,
                        &response.status_text,
                        &headers_json,
                        &response.body,
                        &now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, partition: &str, request: &Request) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = compute_cache_key(&request.method, request.url.as_str());
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE partition = ?1 AND key = ?2",
                    params![partition, key],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn requests(&self, partition: &str) -> Result<Vec<Request>, Error> {
        let partition = partition.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE partition = ?1 ORDER BY rowid ASC")?;
                let rows = stmt
                    .query_map(params![partition], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(method, url)| {
                let url = Url::parse(&url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
                Ok(Request { method, url, headers: Headers::new(), body: None })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/blog/assets/css/style.css");
        let resp = Response::new(200, "body{}").with_header("Content-Type", "text/css");

        db.put("static-v1", &req, &resp).await.unwrap();

        let found = db.lookup("static-v1", &req).await.unwrap().unwrap();
        assert_eq!(found, resp);
        assert!(db.lookup("content-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_creates_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.partitions().await.unwrap().is_empty());

        db.put("images-v1", &get("https://example.com/a.png"), &Response::new(200, "png"))
            .await
            .unwrap();
        assert_eq!(db.partitions().await.unwrap(), vec!["images-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/blog/");
        db.put("content-v1", &req, &Response::new(200, "old")).await.unwrap();
        db.put("content-v1", &req, &Response::new(200, "new")).await.unwrap();

        let found = db.lookup("content-v1", &req).await.unwrap().unwrap();
        assert_eq!(found.text(), "new");
        assert_eq!(db.requests("content-v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_string_is_part_of_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("images-v1", &get("https://example.com/a.png?v=1"), &Response::new(200, "one"))
            .await
            .unwrap();
        assert!(db.lookup("images-v1", &get("https://example.com/a.png")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_partition_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/blog/");
        db.put("old-v0", &req, &Response::new(200, "x")).await.unwrap();

        assert!(db.delete_partition("old-v0").await.unwrap());
        assert!(!db.delete_partition("old-v0").await.unwrap());
        assert!(db.partitions().await.unwrap().is_empty());
        assert!(db.lookup("old-v0", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_entry_and_requests() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let a = get("https://example.com/a.css");
        let b = get("https://example.com/b.js");
        db.put("static-v1", &a, &Response::new(200, "a")).await.unwrap();
        db.put("static-v1", &b, &Response::new(200, "b")).await.unwrap();

        assert!(db.delete("static-v1", &a).await.unwrap());
        assert!(!db.delete("static-v1", &a).await.unwrap());

        let remaining = db.requests("static-v1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, b.url);
        assert_eq!(remaining[0].method, "GET");
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("static-v1").await.unwrap();
        db.open("static-v1").await.unwrap();
        assert_eq!(db.partitions().await.unwrap().len(), 1);
    }
}
