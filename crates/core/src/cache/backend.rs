//! Storage seam between the controller and concrete cache stores.

use async_trait::async_trait;

use super::entries::CachedResponse;
use super::hash::request_key;
use super::{CacheDb, MemoryCache};
use crate::Error;
use crate::worker::{Request, Response};

/// Named namespaces of request-addressed response snapshots.
///
/// Writes never delete individual entries; only [`CacheBackend::delete`] removes data,
/// and it removes a whole namespace.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Create the namespace if absent.
    async fn open(&self, namespace: &str) -> Result<(), Error>;

    /// Look up the entry stored for `request`'s key.
    async fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<CachedResponse>, Error>;

    /// Store or overwrite one entry, creating the namespace if needed.
    async fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store every pair, or none of them.
    async fn put_all(&self, namespace: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    /// Names of every namespace.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a namespace and its entries. Returns whether it existed.
    async fn delete(&self, namespace: &str) -> Result<bool, Error>;

    /// URLs stored in a namespace.
    async fn entries(&self, namespace: &str) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl CacheBackend for CacheDb {
    async fn open(&self, namespace: &str) -> Result<(), Error> {
        self.ensure_namespace(namespace).await
    }

    async fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        self.get_entry(namespace, &request_key(request)).await
    }

    async fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(namespace, request, response).await
    }

    async fn put_all(&self, namespace: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let entries = entries
            .iter()
            .map(|(request, response)| (request_key(request), CachedResponse::capture(request, response)))
            .collect();
        self.upsert_entries(namespace, entries).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.list_namespaces().await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, Error> {
        self.delete_namespace(namespace).await
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<String>, Error> {
        self.list_entry_urls(namespace).await
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn open(&self, namespace: &str) -> Result<(), Error> {
        self.namespaces.write().await.entry(namespace.to_string()).or_default();
        Ok(())
    }

    async fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<CachedResponse>, Error> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .and_then(|entries| entries.get(&request_key(request)))
            .cloned())
    }

    async fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let entry = CachedResponse::capture(request, response);
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(request_key(request), entry);
        Ok(())
    }

    async fn put_all(&self, namespace: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let mut namespaces = self.namespaces.write().await;
        let target = namespaces.entry(namespace.to_string()).or_default();
        for (request, response) in entries {
            target.insert(request_key(request), CachedResponse::capture(request, response));
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Ok(self.namespaces.read().await.keys().cloned().collect())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, Error> {
        Ok(self.namespaces.write().await.remove(namespace).is_some())
    }

    async fn entries(&self, namespace: &str) -> Result<Vec<String>, Error> {
        let namespaces = self.namespaces.read().await;
        let mut urls: Vec<String> = namespaces
            .get(namespace)
            .map(|entries| entries.values().map(|e| e.url.clone()).collect())
            .unwrap_or_default();
        urls.sort();
        Ok(urls)
    }
}
