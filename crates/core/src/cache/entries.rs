//! Namespace and entry operations on the SQLite cache.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::worker::{Headers, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// A stored response snapshot.
///
/// Captured at write time; never refreshed in place, only overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedResponse {
    pub url: String,
    pub method: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CachedResponse {
    /// Snapshot a live response under the request's key.
    pub fn capture(request: &Request, response: &Response) -> Self {
        Self {
            url: request.cache_url().to_string(),
            method: request.cache_method(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response marked as served from cache.
    pub fn into_response(self) -> Result<Response, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.url)))?;
        Ok(Response {
            url,
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            body: self.body.into(),
            from_cache: true,
        })
    }
}

impl CacheDb {
    /// Create a namespace if it does not exist yet.
    pub async fn ensure_namespace(&self, namespace: &str) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_namespaces (name, created_at) VALUES (?1, ?2)",
                    params![namespace, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All namespace names, oldest first.
    pub async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_namespaces ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a namespace and, by cascade, every entry in it.
    ///
    /// Returns whether the namespace existed.
    pub async fn delete_namespace(&self, namespace: &str) -> Result<bool, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_namespaces WHERE name = ?1", params![namespace])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry by request key.
    pub async fn get_entry(&self, namespace: &str, key_hash: &str) -> Result<Option<CachedResponse>, Error> {
        let namespace = namespace.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, method, status, status_text, headers_json, body, stored_at
                     FROM cache_entries WHERE namespace = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![namespace, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, u16>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                match result {
                    Ok((url, method, status, status_text, headers_json, body, stored_at)) => {
                        let headers = serde_json::from_str(&headers_json)
                            .map_err(|e| Error::InvalidInput(format!("corrupt headers for {url}: {e}")))?;
                        Ok(Some(CachedResponse { url, method, status, status_text, headers, body, stored_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or overwrite entries in one transaction, creating the namespace if needed.
    ///
    /// Either every entry is stored or none is.
    pub async fn upsert_entries(&self, namespace: &str, entries: Vec<(String, CachedResponse)>) -> Result<(), Error> {
        let namespace = namespace.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let headers: Vec<String> = entries
                    .iter()
                    .map(|(_, entry)| serde_json::to_string(&entry.headers))
                    .collect::<Result<_, _>>()
                    .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;

                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_namespaces (name, created_at) VALUES (?1, ?2)",
                    params![namespace, now],
                )?;
                for ((key_hash, entry), headers_json) in entries.iter().zip(headers) {
                    tx.execute(
                        "INSERT INTO cache_entries (
                            namespace, key_hash, method, url, status, status_text, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(namespace, key_hash) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            status_text = excluded.status_text,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            &namespace,
                            key_hash,
                            &entry.method,
                            &entry.url,
                            entry.status,
                            &entry.status_text,
                            headers_json,
                            &entry.body,
                            &entry.stored_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of every entry in a namespace.
    pub async fn list_entry_urls(&self, namespace: &str) -> Result<Vec<String>, Error> {
        let namespace = namespace.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE namespace = ?1 ORDER BY url ASC")?;
                let urls = stmt
                    .query_map(params![namespace], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a single request/response pair.
    pub async fn put_entry(&self, namespace: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let entry = CachedResponse::capture(request, response);
        self.upsert_entries(namespace, vec![(request_key(request), entry)]).await
    }
}
