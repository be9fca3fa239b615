//! Offline cache worker: install/activate lifecycle and the
//! network-first-with-fallback request policy.

use super::origin::{AssetOrigin, OriginError};
use super::store::{AssetRequest, CacheStore, StoreError, StoredResponse};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Installing,
    Installed,
    Active,
}

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("seed fetch failed for {url}")]
    Seed {
        url: String,
        #[source]
        source: OriginError,
    },

    #[error("seed {url} returned a non-cacheable response (status {status})")]
    SeedNotCacheable { url: String, status: u16 },

    #[error("no usable snapshot for store {version}")]
    NoSnapshot { version: String },

    #[error("cannot activate from the {0:?} phase")]
    ActivateFromPhase(Phase),

    #[error("cache is not active (phase {0:?})")]
    NotActive(Phase),

    #[error(transparent)]
    Origin(#[from] OriginError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The offline asset cache. One instance fronts one versioned store; a
/// version bump is a new instance whose activation purges every other
/// store name.
///
/// Requests are handled network-first: a reachable origin always wins and
/// refreshes the store, the store is the resilience fallback, and
/// navigations degrade to the designated offline page.
pub struct OfflineCache<S, O> {
    store: S,
    origin: O,
    version: String,
    seed_urls: Vec<String>,
    offline_url: String,
    phase: RwLock<Phase>,
}

impl<S: CacheStore, O: AssetOrigin> OfflineCache<S, O> {
    /// `version` is the store name for this generation; it is explicit
    /// configuration, decided at deploy time by the caller.
    pub fn new(
        store: S,
        origin: O,
        version: impl Into<String>,
        seed_urls: Vec<String>,
        offline_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            origin,
            version: version.into(),
            seed_urls,
            offline_url: offline_url.into(),
            phase: RwLock::new(Phase::Uninitialized),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    /// Fetches every seed URL plus the offline fallback page, then opens
    /// the current-version store and commits the staged responses.
    /// Nothing is written until every seed fetch has succeeded, so a
    /// failed install leaves any pre-existing store untouched — including
    /// a snapshot left by a previous session of this same version. No
    /// partial cutover.
    pub async fn install(&self) -> Result<(), OfflineError> {
        *self.phase.write().await = Phase::Installing;

        let mut seeds: Vec<&str> = self.seed_urls.iter().map(String::as_str).collect();
        if !seeds.contains(&self.offline_url.as_str()) {
            seeds.push(&self.offline_url);
        }

        let mut staged = Vec::with_capacity(seeds.len());
        for url in seeds {
            let request = AssetRequest::get(url);
            let response = match self.origin.fetch(&request).await {
                Ok(response) => response,
                Err(source) => {
                    *self.phase.write().await = Phase::Uninitialized;
                    return Err(OfflineError::Seed {
                        url: url.to_string(),
                        source,
                    });
                }
            };

            if !response.is_cacheable() {
                *self.phase.write().await = Phase::Uninitialized;
                return Err(OfflineError::SeedNotCacheable {
                    url: url.to_string(),
                    status: response.status,
                });
            }

            staged.push((request.key(), response));
        }

        if let Err(err) = self.commit(staged).await {
            *self.phase.write().await = Phase::Uninitialized;
            return Err(err);
        }

        *self.phase.write().await = Phase::Installed;
        info!(version = %self.version, "asset store installed");
        Ok(())
    }

    async fn commit(
        &self,
        staged: Vec<(String, StoredResponse)>,
    ) -> Result<(), OfflineError> {
        self.store.open(&self.version).await?;
        for (key, response) in staged {
            self.store.put(&self.version, key, response).await?;
        }
        Ok(())
    }

    /// Accepts a store populated by a previous session of the same
    /// version when the origin is unavailable at startup. Usable only if
    /// that session's install completed, i.e. the offline page is present.
    pub async fn resume(&self) -> Result<(), OfflineError> {
        let fallback = self
            .store
            .lookup(&self.version, &AssetRequest::get(&self.offline_url).key())
            .await?;
        if fallback.is_none() {
            return Err(OfflineError::NoSnapshot {
                version: self.version.clone(),
            });
        }

        *self.phase.write().await = Phase::Installed;
        info!(version = %self.version, "resuming on snapshot store");
        Ok(())
    }

    /// Deletes every store whose name is not the current version, then
    /// begins accepting requests. Afterwards exactly one store is live.
    pub async fn activate(&self) -> Result<(), OfflineError> {
        let phase = self.phase().await;
        if phase != Phase::Installed {
            return Err(OfflineError::ActivateFromPhase(phase));
        }

        for name in self.store.store_names().await? {
            if name != self.version {
                self.store.delete_store(&name).await?;
                debug!(store = %name, "purged stale asset store");
            }
        }

        *self.phase.write().await = Phase::Active;
        Ok(())
    }

    /// Handles one request. Non-GET and cross-origin requests pass
    /// through with no store interaction; intercepted requests prefer the
    /// origin, refresh the store on success, and fall back to the store
    /// (then to the offline page, for navigations) on failure.
    pub async fn handle(&self, request: &AssetRequest) -> Result<StoredResponse, OfflineError> {
        let phase = self.phase().await;
        if phase != Phase::Active {
            return Err(OfflineError::NotActive(phase));
        }

        if !request.intercepted() {
            return Ok(self.origin.fetch(request).await?);
        }

        let key = request.key();
        let cached = self.store.lookup(&self.version, &key).await?;

        match self.origin.fetch(request).await {
            Ok(response) if response.is_cacheable() => {
                self.store
                    .put(&self.version, key, response.clone())
                    .await?;
                Ok(response)
            }
            Ok(response) => Ok(response),
            Err(err) => {
                if let Some(hit) = cached {
                    debug!(url = %request.url, "origin unreachable, serving cached copy");
                    return Ok(hit);
                }
                if request.is_navigation() {
                    let fallback_key = AssetRequest::get(&self.offline_url).key();
                    if let Some(page) = self.store.lookup(&self.version, &fallback_key).await? {
                        warn!(url = %request.url, "origin unreachable, serving offline page");
                        return Ok(page);
                    }
                }
                Err(OfflineError::Origin(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::store::MemoryStore;
    use axum::http::Method;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockOrigin {
        routes: Mutex<HashMap<String, StoredResponse>>,
        reachable: AtomicBool,
    }

    impl MockOrigin {
        fn with(routes: &[(&str, StoredResponse)]) -> Self {
            Self {
                routes: Mutex::new(
                    routes
                        .iter()
                        .map(|(url, response)| (url.to_string(), response.clone()))
                        .collect(),
                ),
                reachable: AtomicBool::new(true),
            }
        }

        fn set_reachable(&self, reachable: bool) {
            self.reachable.store(reachable, Ordering::SeqCst);
        }

        fn set_route(&self, url: &str, response: StoredResponse) {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), response);
        }
    }

    impl AssetOrigin for &MockOrigin {
        async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, OriginError> {
            if !self.reachable.load(Ordering::SeqCst) {
                return Err(OriginError::Io(std::io::Error::from(
                    std::io::ErrorKind::NotConnected,
                )));
            }
            self.routes
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .ok_or_else(|| OriginError::NotFound {
                    url: request.url.clone(),
                })
        }
    }

    fn page(body: &str) -> StoredResponse {
        StoredResponse::ok("text/html; charset=utf-8", body.as_bytes().to_vec())
    }

    fn seeded_origin() -> MockOrigin {
        MockOrigin::with(&[
            ("/", page("root")),
            ("/index.html", page("index")),
            ("/offline.html", page("offline")),
        ])
    }

    async fn active_cache<'a>(
        origin: &'a MockOrigin,
        version: &str,
    ) -> OfflineCache<MemoryStore, &'a MockOrigin> {
        let cache = OfflineCache::new(
            MemoryStore::new(),
            origin,
            version,
            vec!["/".to_string(), "/index.html".to_string()],
            "/offline.html",
        );
        cache.install().await.unwrap();
        cache.activate().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn install_populates_every_seed() {
        let origin = seeded_origin();
        let cache = OfflineCache::new(
            MemoryStore::new(),
            &origin,
            "v1",
            vec!["/".to_string(), "/index.html".to_string()],
            "/offline.html",
        );
        cache.install().await.unwrap();
        cache.activate().await.unwrap();

        for url in ["/", "/index.html", "/offline.html"] {
            origin.set_reachable(false);
            let response = cache.handle(&AssetRequest::get(url)).await.unwrap();
            assert!(!response.body.is_empty(), "seed {url} missing");
        }
    }

    #[tokio::test]
    async fn seed_failure_aborts_install_and_keeps_old_store() {
        let origin = MockOrigin::with(&[("/", page("root"))]);
        let store = MemoryStore::new();
        store.open("v1").await.unwrap();
        store
            .put("v1", "GET /".to_string(), page("old root"))
            .await
            .unwrap();

        let cache = OfflineCache::new(
            store,
            &origin,
            "v2",
            vec!["/".to_string(), "/index.html".to_string()],
            "/offline.html",
        );
        let err = cache.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::Seed { ref url, .. } if url == "/index.html"));
        assert_eq!(cache.phase().await, Phase::Uninitialized);

        // No partial cutover: v2 is gone, v1 is untouched.
        assert_eq!(cache.store.store_names().await.unwrap(), vec!["v1"]);
        let old = cache.store.lookup("v1", "GET /").await.unwrap().unwrap();
        assert_eq!(old.body, b"old root".to_vec());
    }

    #[tokio::test]
    async fn non_cacheable_seed_aborts_install() {
        let origin = MockOrigin::with(&[
            ("/", page("root")),
            ("/index.html", page("index")),
            (
                "/offline.html",
                StoredResponse::with_status(500, "text/html", Vec::new()),
            ),
        ]);
        let cache = OfflineCache::new(
            MemoryStore::new(),
            &origin,
            "v1",
            vec!["/".to_string(), "/index.html".to_string()],
            "/offline.html",
        );
        let err = cache.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::SeedNotCacheable { status: 500, .. }));
    }

    #[tokio::test]
    async fn activate_purges_every_stale_store() {
        let origin = seeded_origin();
        let store = MemoryStore::new();
        store.open("v1").await.unwrap();

        let cache = OfflineCache::new(
            store,
            &origin,
            "v2",
            vec!["/".to_string()],
            "/offline.html",
        );
        cache.install().await.unwrap();
        cache.activate().await.unwrap();

        assert_eq!(cache.store.store_names().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn origin_wins_when_reachable() {
        let origin = seeded_origin();
        let cache = active_cache(&origin, "v1").await;

        origin.set_route("/index.html", page("fresher index"));
        let response = cache
            .handle(&AssetRequest::get("/index.html"))
            .await
            .unwrap();
        assert_eq!(response.body, b"fresher index".to_vec());

        // The refreshed copy is what survives an outage.
        origin.set_reachable(false);
        let response = cache
            .handle(&AssetRequest::get("/index.html"))
            .await
            .unwrap();
        assert_eq!(response.body, b"fresher index".to_vec());
    }

    #[tokio::test]
    async fn cached_copy_served_when_origin_unreachable() {
        let origin = seeded_origin();
        origin.set_route("/app.css", StoredResponse::ok("text/css", b"body{}".to_vec()));
        let cache = active_cache(&origin, "v1").await;

        cache.handle(&AssetRequest::get("/app.css")).await.unwrap();
        origin.set_reachable(false);

        let response = cache.handle(&AssetRequest::get("/app.css")).await.unwrap();
        assert_eq!(response.body, b"body{}".to_vec());
    }

    #[tokio::test]
    async fn navigation_falls_back_to_offline_page() {
        let origin = seeded_origin();
        let cache = active_cache(&origin, "v1").await;
        origin.set_reachable(false);

        let response = cache
            .handle(&AssetRequest::navigate("/never-fetched.html"))
            .await
            .unwrap();
        assert_eq!(response.body, b"offline".to_vec());
    }

    #[tokio::test]
    async fn plain_asset_miss_propagates_the_failure() {
        let origin = seeded_origin();
        let cache = active_cache(&origin, "v1").await;
        origin.set_reachable(false);

        let err = cache
            .handle(&AssetRequest::get("/never-fetched.css"))
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineError::Origin(_)));
    }

    #[tokio::test]
    async fn pass_through_requests_leave_the_store_unchanged() {
        let origin = seeded_origin();
        origin.set_route(
            "https://pay.example.com/widget.js",
            StoredResponse::opaque(),
        );
        let cache = active_cache(&origin, "v1").await;

        let cross = AssetRequest::get("https://pay.example.com/widget.js");
        cache.handle(&cross).await.unwrap();
        assert!(cache.store.lookup("v1", &cross.key()).await.unwrap().is_none());

        let post = AssetRequest::with_method(Method::POST, "/");
        let response = cache.handle(&post).await.unwrap();
        assert_eq!(response.body, b"root".to_vec());
        let stored = cache.store.lookup("v1", &post.key()).await.unwrap();
        assert!(stored.is_none());

        // A pass-through failure propagates untouched, never the fallback.
        origin.set_reachable(false);
        let err = cache.handle(&cross).await.unwrap_err();
        assert!(matches!(err, OfflineError::Origin(OriginError::Io(_))));
        origin.set_reachable(true);
    }

    #[tokio::test]
    async fn non_cacheable_response_is_returned_but_not_stored() {
        let origin = seeded_origin();
        origin.set_route(
            "/flaky.json",
            StoredResponse::with_status(503, "application/json", b"{}".to_vec()),
        );
        let cache = active_cache(&origin, "v1").await;

        let response = cache.handle(&AssetRequest::get("/flaky.json")).await.unwrap();
        assert_eq!(response.status, 503);
        let stored = cache.store.lookup("v1", "GET /flaky.json").await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn repeated_handling_stores_identical_entries() {
        let origin = seeded_origin();
        let cache = active_cache(&origin, "v1").await;

        cache.handle(&AssetRequest::get("/index.html")).await.unwrap();
        let first = cache.store.lookup("v1", "GET /index.html").await.unwrap();
        cache.handle(&AssetRequest::get("/index.html")).await.unwrap();
        let second = cache.store.lookup("v1", "GET /index.html").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn handle_before_activation_is_an_error() {
        let origin = seeded_origin();
        let cache = OfflineCache::new(
            MemoryStore::new(),
            &origin,
            "v1",
            vec!["/".to_string()],
            "/offline.html",
        );
        cache.install().await.unwrap();

        let err = cache.handle(&AssetRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, OfflineError::NotActive(Phase::Installed)));
    }

    #[tokio::test]
    async fn resume_requires_a_completed_snapshot() {
        let origin = seeded_origin();
        origin.set_reachable(false);

        let store = MemoryStore::new();
        let cache = OfflineCache::new(store, &origin, "v1", vec!["/".to_string()], "/offline.html");
        assert!(matches!(
            cache.resume().await.unwrap_err(),
            OfflineError::NoSnapshot { .. }
        ));

        // A store left behind by a completed install is acceptable.
        cache.store.open("v1").await.unwrap();
        cache
            .store
            .put("v1", "GET /offline.html".to_string(), page("offline"))
            .await
            .unwrap();
        cache.resume().await.unwrap();
        cache.activate().await.unwrap();

        let response = cache
            .handle(&AssetRequest::navigate("/anything.html"))
            .await
            .unwrap();
        assert_eq!(response.body, b"offline".to_vec());
    }

    #[tokio::test]
    async fn failed_install_leaves_the_snapshot_usable_for_resume() {
        let store = MemoryStore::new();
        store.open("v1").await.unwrap();
        store
            .put("v1", "GET /offline.html".to_string(), page("offline"))
            .await
            .unwrap();
        store
            .put("v1", "GET /".to_string(), page("root snapshot"))
            .await
            .unwrap();

        let origin = seeded_origin();
        origin.set_reachable(false);
        let cache = OfflineCache::new(store, &origin, "v1", vec!["/".to_string()], "/offline.html");

        assert!(cache.install().await.is_err());
        assert_eq!(cache.store.store_names().await.unwrap(), vec!["v1"]);

        cache.resume().await.unwrap();
        cache.activate().await.unwrap();
        let response = cache.handle(&AssetRequest::get("/")).await.unwrap();
        assert_eq!(response.body, b"root snapshot".to_vec());
    }

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        async fn open(&self, _name: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn lookup(&self, _name: &str, _key: &str) -> Result<Option<StoredResponse>, StoreError> {
            Ok(None)
        }

        async fn put(
            &self,
            _name: &str,
            _key: String,
            _response: StoredResponse,
        ) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )))
        }

        async fn delete_store(&self, _name: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn store_names(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn store_failure_during_install_resets_the_phase() {
        let origin = seeded_origin();
        let cache = OfflineCache::new(
            BrokenStore,
            &origin,
            "v1",
            vec!["/".to_string()],
            "/offline.html",
        );

        let err = cache.install().await.unwrap_err();
        assert!(matches!(err, OfflineError::Store(_)));
        assert_eq!(cache.phase().await, Phase::Uninitialized);
    }
}
