//! Named response stores and the request/response vocabulary they share
//! with the origin.

use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

/// How a request reached the worker. Navigations get the offline fallback
/// page when every other source fails; plain asset requests do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Asset,
}

/// Request identity as the store sees it: method plus URL.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: Method,
    pub url: String,
    pub mode: RequestMode,
}

impl AssetRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            mode: RequestMode::Asset,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            mode: RequestMode::Navigate,
        }
    }

    pub fn with_method(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            mode: RequestMode::Asset,
        }
    }

    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    /// Rooted paths are same-origin; absolute URLs belong to someone else.
    pub fn same_origin(&self) -> bool {
        self.url.starts_with('/')
    }

    /// Only same-origin GETs are intercepted; everything else passes
    /// through without touching the store.
    pub fn intercepted(&self) -> bool {
        self.method == Method::GET && self.same_origin()
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A captured response snapshot: status, headers, body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Opaque cross-origin responses carry no inspectable status and are
    /// never stored.
    #[serde(default)]
    pub opaque: bool,
}

impl StoredResponse {
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), content_type.into())],
            body,
            opaque: false,
        }
    }

    pub fn with_status(status: u16, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.into())],
            body,
            opaque: false,
        }
    }

    pub fn opaque() -> Self {
        Self {
            status: 0,
            headers: Vec::new(),
            body: Vec::new(),
            opaque: true,
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }

    /// Success status and not opaque; anything else is a policy exclusion
    /// and is returned without being stored.
    pub fn is_cacheable(&self) -> bool {
        !self.opaque && (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage collaborator for the offline cache: named, versioned stores
/// mapping request identity to a captured response. Each call is atomic
/// per key; concurrent writers to one key race last-write-wins.
pub trait CacheStore: Send + Sync {
    fn open(&self, name: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn lookup(
        &self,
        name: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<StoredResponse>, StoreError>> + Send;

    fn put(
        &self,
        name: &str,
        key: String,
        response: StoredResponse,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_store(&self, name: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn store_names(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

type StoreMap = BTreeMap<String, BTreeMap<String, StoredResponse>>;

/// In-memory store, optionally mirrored to a JSON snapshot file after
/// every mutation so its contents survive across sessions.
pub struct MemoryStore {
    stores: RwLock<StoreMap>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(StoreMap::new()),
            snapshot_path: None,
        }
    }

    /// Loads a previous session's snapshot if one exists; a missing file
    /// means a fresh store, a corrupt one is logged and discarded.
    pub async fn with_snapshot(path: PathBuf) -> Self {
        let stores = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(stores) => stores,
                Err(err) => {
                    warn!("discarding unreadable asset snapshot: {err}");
                    StoreMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreMap::new(),
            Err(err) => {
                warn!("failed to read asset snapshot: {err}");
                StoreMap::new()
            }
        };

        Self {
            stores: RwLock::new(stores),
            snapshot_path: Some(path),
        }
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let payload = {
            let stores = self.stores.read().await;
            serde_json::to_vec(&*stores)?
        };
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<(), StoreError> {
        self.stores
            .write()
            .await
            .entry(name.to_string())
            .or_default();
        self.persist().await
    }

    async fn lookup(&self, name: &str, key: &str) -> Result<Option<StoredResponse>, StoreError> {
        Ok(self
            .stores
            .read()
            .await
            .get(name)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        name: &str,
        key: String,
        response: StoredResponse,
    ) -> Result<(), StoreError> {
        self.stores
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(key, response);
        self.persist().await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, StoreError> {
        let removed = self.stores.write().await.remove(name).is_some();
        self.persist().await?;
        Ok(removed)
    }

    async fn store_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.stores.read().await.keys().cloned().collect())
    }
}
