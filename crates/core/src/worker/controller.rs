//! The cache controller: install, activate and fetch interception.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::Url;

use super::lifecycle::{Lifecycle, WorkerState};
use super::namespace::{CacheNamespace, Clock};
use super::network::Network;
use super::platform::Platform;
use super::policy::CachePolicy;
use super::request::{Request, Response};
use super::route::Route;
use crate::Error;
use crate::cache::CacheBackend;

/// Result of the install event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub namespace: String,
    /// Manifest URLs stored by this install. Empty when population was aborted.
    pub precached: Vec<String>,
    /// Why population was aborted, if it was.
    pub precache_error: Option<String>,
    /// Whether the host accepted the skip-waiting request.
    pub skip_waiting: bool,
}

/// Result of the activate event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivationReport {
    pub namespace: String,
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

/// Result of a fetch interception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host handles the request itself.
    Bypassed,
    /// Answered by the controller, from the network or from cache.
    Responded { route: Route, response: Response },
}

/// Offline cache controller for one deployment version.
///
/// Owns a single namespace named at construction. Fetch interceptions may run
/// concurrently; install and activate are serialized by the lifecycle.
pub struct CacheController {
    policy: CachePolicy,
    namespace: CacheNamespace,
    cache: Arc<dyn CacheBackend>,
    network: Arc<dyn Network>,
    platform: Arc<dyn Platform>,
    lifecycle: Lifecycle,
    writes: Mutex<JoinSet<()>>,
}

impl CacheController {
    pub fn new(
        policy: CachePolicy, cache: Arc<dyn CacheBackend>, network: Arc<dyn Network>, platform: Arc<dyn Platform>,
        clock: &dyn Clock,
    ) -> Self {
        let namespace = CacheNamespace::versioned(&policy.cache_prefix, clock);
        tracing::debug!(namespace = namespace.name(), "cache controller created");
        Self {
            policy,
            namespace,
            cache,
            network,
            platform,
            lifecycle: Lifecycle::new(),
            writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace.name()
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<dyn CacheBackend> {
        &self.cache
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    /// Populate the precache, then ask the host to skip waiting.
    ///
    /// A failed population is reported, not returned as an error: install still
    /// completes and skip-waiting is still requested.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let namespace = self.namespace.name().to_string();

        let mut report = self
            .lifecycle
            .transition(WorkerState::Parsed, WorkerState::Installing, WorkerState::Installed, async {
                let (precached, precache_error) = match self.precache().await {
                    Ok(urls) => {
                        tracing::info!(namespace = %namespace, count = urls.len(), "precache populated");
                        (urls, None)
                    }
                    Err(e) => {
                        tracing::warn!(namespace = %namespace, error = %e, "precache population failed");
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                Ok(InstallReport { namespace: namespace.clone(), precached, precache_error, skip_waiting: false })
            })
            .await?;

        report.skip_waiting = match self.platform.skip_waiting().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "skip waiting rejected by host");
                false
            }
        };

        Ok(report)
    }

    /// Fetch the whole manifest, then store it in one batch.
    async fn precache(&self) -> Result<Vec<String>, Error> {
        let namespace = self.namespace.name();
        self.cache.open(namespace).await?;

        let requests: Vec<Request> = self.policy.precache.iter().cloned().map(Request::get).collect();
        let fetched = try_join_all(requests.into_iter().map(|request| async move {
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::PrecacheFailed(format!("{}: {e}", request.url)))?;
            if !response.is_ok() {
                return Err(Error::PrecacheFailed(format!("{} returned status {}", request.url, response.status)));
            }
            Ok((request, response))
        }))
        .await?;

        self.cache.put_all(namespace, &fetched).await?;

        Ok(fetched.iter().map(|(request, _)| request.cache_url().to_string()).collect())
    }

    /// Delete every stale namespace, then claim open clients.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle
            .transition(WorkerState::Installed, WorkerState::Activating, WorkerState::Activated, async {
                let stale: Vec<String> = self
                    .cache
                    .keys()
                    .await?
                    .into_iter()
                    .filter(|name| !self.namespace.is_current(name))
                    .collect();

                let results = join_all(stale.iter().map(|name| self.cache.delete(name))).await;

                let mut deleted = Vec::with_capacity(stale.len());
                for (name, result) in stale.into_iter().zip(results) {
                    match result {
                        Ok(true) => {
                            tracing::info!(namespace = %name, "deleted stale cache namespace");
                            deleted.push(name);
                        }
                        Ok(false) => tracing::debug!(namespace = %name, "stale namespace already gone"),
                        Err(e) => return Err(e),
                    }
                }

                let clients_claimed = match self.platform.claim_clients().await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "claiming clients failed");
                        false
                    }
                };

                Ok(ActivationReport { namespace: self.namespace.name().to_string(), deleted, clients_claimed })
            })
            .await
    }

    /// Route an intercepted request to its strategy.
    ///
    /// # Errors
    ///
    /// `FetchFailed` when the network rejects the fetch and no cached fallback exists.
    pub async fn handle_fetch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let route = self.policy.router.classify(&request);
        tracing::debug!(url = %request.url, method = %request.method, ?route, "fetch intercepted");

        let response = match route {
            Route::Bypass => return Ok(FetchOutcome::Bypassed),
            Route::Excluded | Route::Default => self.network_only(&request).await?,
            Route::Asset => self.network_first(request, None).await?,
            Route::Document => {
                let root = self.policy.root_url();
                self.network_first(request, Some(root)).await?
            }
        };

        Ok(FetchOutcome::Responded { route, response })
    }

    async fn network_only(&self, request: &Request) -> Result<Response, Error> {
        self.network
            .fetch(request)
            .await
            .map_err(|e| Error::FetchFailed(format!("{}: {e}", request.url)))
    }

    async fn network_first(&self, request: Request, fallback: Option<Url>) -> Result<Response, Error> {
        let err = match self.network.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store_in_background(request, response.clone()).await;
                }
                return Ok(response);
            }
            Err(e) => e,
        };

        tracing::debug!(url = %request.url, error = %err, "network failed, trying cache");

        if let Some(hit) = self.lookup(&request).await? {
            return Ok(hit);
        }

        if let Some(root) = fallback
            && let Some(hit) = self.lookup(&Request::get(root)).await?
        {
            tracing::debug!(url = %request.url, "serving cached app shell");
            return Ok(hit);
        }

        Err(Error::FetchFailed(format!("{}: {err}", request.url)))
    }

    async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        match self.cache.match_request(self.namespace.name(), request).await {
            Ok(Some(entry)) => entry.into_response().map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                Ok(None)
            }
        }
    }

    async fn store_in_background(&self, request: Request, response: Response) {
        let cache = Arc::clone(&self.cache);
        let namespace = self.namespace.name().to_string();

        let mut writes = self.writes.lock().await;
        while writes.try_join_next().is_some() {}
        writes.spawn(async move {
            if let Err(e) = cache.put(&namespace, &request, &response).await {
                tracing::warn!(url = %request.url, error = %e, "background cache write failed");
            }
        });
    }

    /// Background cache writes not yet reaped.
    pub async fn pending_writes(&self) -> usize {
        let mut writes = self.writes.lock().await;
        while writes.try_join_next().is_some() {}
        writes.len()
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        let mut writes = self.writes.lock().await;
        while let Some(result) = writes.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background cache write aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::AppConfig;
    use crate::worker::request::Destination;
    use crate::worker::testing::{FixedClock, RecordingPlatform, ScriptedNetwork};

    const ORIGIN: &str = "https://mini.example.com";

    struct Harness {
        controller: CacheController,
        cache: MemoryCache,
        network: Arc<ScriptedNetwork>,
        platform: Arc<RecordingPlatform>,
    }

    fn harness_with(config: AppConfig, millis: i64) -> Harness {
        let cache = MemoryCache::new();
        let network = Arc::new(ScriptedNetwork::new());
        let platform = Arc::new(RecordingPlatform::default());
        let policy = CachePolicy::from_config(&config).unwrap();
        let controller = CacheController::new(
            policy,
            Arc::new(cache.clone()),
            network.clone(),
            platform.clone(),
            &FixedClock(millis),
        );
        Harness { controller, cache, network, platform }
    }

    fn harness() -> Harness {
        harness_with(AppConfig { origin: ORIGIN.into(), ..Default::default() }, 1_000)
    }

    fn shell_harness() -> Harness {
        let precache = vec!["/".into(), "/manifest.json".into()];
        harness_with(AppConfig { origin: ORIGIN.into(), precache, ..Default::default() }, 1_000)
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    fn served(outcome: FetchOutcome) -> (Route, Response) {
        match outcome {
            FetchOutcome::Responded { route, response } => (route, response),
            FetchOutcome::Bypassed => panic!("request was bypassed"),
        }
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let h = shell_harness();
        h.network.respond("/", 200, "<html>shell</html>");
        h.network.respond("/manifest.json", 200, "{}");

        let report = h.controller.install().await.unwrap();

        assert_eq!(report.namespace, "tma-cache-v1000");
        assert_eq!(report.precached, vec![url("/").to_string(), url("/manifest.json").to_string()]);
        assert!(report.precache_error.is_none());
        assert!(report.skip_waiting);
        assert_eq!(h.controller.state(), WorkerState::Installed);
        assert_eq!(
            h.cache.entries("tma-cache-v1000").await.unwrap(),
            vec![url("/").to_string(), url("/manifest.json").to_string()]
        );
        assert_eq!(h.platform.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn test_install_batch_is_all_or_nothing() {
        let h = shell_harness();
        h.network.respond("/", 200, "<html>shell</html>");
        h.network.fail("/manifest.json");

        let report = h.controller.install().await.unwrap();

        assert!(report.precached.is_empty());
        assert!(report.precache_error.unwrap().contains("PRECACHE_FAILED"));
        assert!(report.skip_waiting);
        assert_eq!(h.controller.state(), WorkerState::Installed);
        assert_eq!(h.cache.entry_count("tma-cache-v1000").await, 0);
        assert_eq!(h.platform.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let h = shell_harness();
        h.network.respond("/", 200, "<html>shell</html>");
        h.network.respond("/manifest.json", 404, "");

        let report = h.controller.install().await.unwrap();
        assert!(report.precache_error.unwrap().contains("404"));
        assert_eq!(h.cache.entry_count("tma-cache-v1000").await, 0);
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let h = harness();
        h.controller.install().await.unwrap();
        assert!(matches!(h.controller.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let h = harness();
        assert!(matches!(h.controller.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(h.controller.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_leaves_only_current_namespace() {
        let h = harness();
        h.cache.open("tma-cache-v1").await.unwrap();
        h.cache.open("tma-cache-v500").await.unwrap();
        h.cache.open("unrelated").await.unwrap();
        h.network.respond("/", 200, "shell");

        h.controller.install().await.unwrap();
        let report = h.controller.activate().await.unwrap();

        assert_eq!(h.cache.keys().await.unwrap(), vec!["tma-cache-v1000".to_string()]);
        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["tma-cache-v1", "tma-cache-v500", "unrelated"]);
        assert!(report.clients_claimed);
        assert_eq!(h.platform.claim_calls(), 1);
        assert_eq!(h.controller.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_after_failed_precache() {
        let h = harness();
        h.cache.open("tma-cache-v1").await.unwrap();

        h.controller.install().await.unwrap();
        h.controller.activate().await.unwrap();

        assert_eq!(h.cache.keys().await.unwrap(), vec!["tma-cache-v1000".to_string()]);
    }

    #[tokio::test]
    async fn test_non_get_bypassed() {
        let h = harness();
        let request = Request::get(url("/api/ads")).with_method("POST");

        let outcome = h.controller.handle_fetch(request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Bypassed);
        assert_eq!(h.network.calls(), 0);
    }

    #[tokio::test]
    async fn test_excluded_never_touches_cache() {
        let h = harness();
        let request = Request::get(url("/api/referrals"));
        h.network.respond("/api/referrals", 200, "[]");

        let (route, response) = served(h.controller.handle_fetch(request.clone()).await.unwrap());
        h.controller.settle().await;

        assert_eq!(route, Route::Excluded);
        assert_eq!(response.body, "[]");
        assert!(h.cache.keys().await.unwrap().is_empty());

        // A seeded entry is not read either.
        h.cache
            .put(h.controller.namespace(), &request, &Response::new(request.url.clone(), 200).with_body("stale"))
            .await
            .unwrap();
        h.network.fail("/api/referrals");
        let result = h.controller.handle_fetch(request).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_asset_success_is_cached() {
        let h = harness();
        let request = Request::get(url("/assets/index.js")).with_destination(Destination::Script);
        h.network.respond("/assets/index.js", 200, "console.log('v2')");

        let (route, response) = served(h.controller.handle_fetch(request.clone()).await.unwrap());
        h.controller.settle().await;

        assert_eq!(route, Route::Asset);
        assert!(!response.from_cache);
        let stored = h.cache.match_request(h.controller.namespace(), &request).await.unwrap().unwrap();
        assert_eq!(stored.body, b"console.log('v2')");
    }

    #[tokio::test]
    async fn test_asset_network_failure_uses_cache() {
        let h = harness();
        let request = Request::get(url("/assets/index.css"));
        h.cache
            .put(h.controller.namespace(), &request, &Response::new(request.url.clone(), 200).with_body("body{}"))
            .await
            .unwrap();
        h.network.fail("/assets/index.css");

        let (route, response) = served(h.controller.handle_fetch(request).await.unwrap());
        assert_eq!(route, Route::Asset);
        assert!(response.from_cache);
        assert_eq!(response.body, "body{}");
    }

    #[tokio::test]
    async fn test_asset_network_failure_without_cache_fails() {
        let h = harness();
        h.cache
            .put(h.controller.namespace(), &Request::get(url("/")), &Response::new(url("/"), 200))
            .await
            .unwrap();
        h.network.fail("/assets/missing.js");

        let result = h.controller.handle_fetch(Request::get(url("/assets/missing.js"))).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_document_falls_back_to_root() {
        let h = harness();
        let root = Request::get(url("/"));
        h.cache
            .put(h.controller.namespace(), &root, &Response::new(root.url.clone(), 200).with_body("<html>shell</html>"))
            .await
            .unwrap();
        h.network.fail("/admin/users/42");

        let request = Request::navigate(url("/admin/users/42"));
        let (route, response) = served(h.controller.handle_fetch(request).await.unwrap());

        assert_eq!(route, Route::Document);
        assert!(response.from_cache);
        assert_eq!(response.body, "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_document_prefers_exact_entry() {
        let h = harness();
        let ns = h.controller.namespace().to_string();
        let page = Request::navigate(url("/stats"));
        h.cache.put(&ns, &Request::get(url("/")), &Response::new(url("/"), 200).with_body("shell")).await.unwrap();
        h.cache.put(&ns, &page, &Response::new(page.url.clone(), 200).with_body("stats")).await.unwrap();
        h.network.fail("/stats");

        let (_, response) = served(h.controller.handle_fetch(page).await.unwrap());
        assert_eq!(response.body, "stats");
    }

    #[tokio::test]
    async fn test_document_double_miss_fails() {
        let h = harness();
        h.network.fail("/stats");

        let result = h.controller.handle_fetch(Request::navigate(url("/stats"))).await;
        assert!(matches!(result, Err(Error::FetchFailed(_))));
    }

    #[tokio::test]
    async fn test_non_200_passes_through_uncached() {
        let h = harness();
        h.network.respond("/assets/gone.js", 404, "not found");
        h.network.respond("/old-page", 301, "");

        let asset = Request::get(url("/assets/gone.js"));
        let (_, response) = served(h.controller.handle_fetch(asset.clone()).await.unwrap());
        assert_eq!(response.status, 404);

        let page = Request::navigate(url("/old-page"));
        let (_, response) = served(h.controller.handle_fetch(page.clone()).await.unwrap());
        assert_eq!(response.status, 301);

        h.controller.settle().await;
        let ns = h.controller.namespace();
        assert!(h.cache.match_request(ns, &asset).await.unwrap().is_none());
        assert!(h.cache.match_request(ns, &page).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_default_route_is_network_only() {
        let h = harness();
        let request = Request::get(url("/manifest.json"));
        h.network.respond("/manifest.json", 200, "{}");

        let (route, _) = served(h.controller.handle_fetch(request.clone()).await.unwrap());
        h.controller.settle().await;

        assert_eq!(route, Route::Default);
        assert!(h.cache.match_request(h.controller.namespace(), &request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_fetches() {
        let h = harness();
        for path in ["/a.js", "/b.js", "/c.css"] {
            h.network.respond(path, 200, path);
        }

        let results = join_all(
            ["/a.js", "/b.js", "/c.css"]
                .into_iter()
                .map(|path| h.controller.handle_fetch(Request::get(url(path)))),
        )
        .await;
        h.controller.settle().await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(h.cache.entry_count(h.controller.namespace()).await, 3);
        assert_eq!(h.controller.pending_writes().await, 0);
    }
}
