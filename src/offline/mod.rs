//! Offline asset cache: a versioned response store, an origin to fetch
//! from, and a worker that serves requests network-first with the store
//! (and a designated offline page) as the resilience fallback.
//!
//! The worker is host-agnostic: the HTTP layer dispatches requests into
//! [`OfflineCache::handle`] and maps the result back onto responses, so
//! the whole policy is testable with an in-memory store and a mock origin.

mod origin;
mod store;
mod worker;

pub use origin::{AssetOrigin, FsOrigin, OriginError};
pub use store::{AssetRequest, CacheStore, MemoryStore, RequestMode, StoreError, StoredResponse};
pub use worker::{OfflineCache, OfflineError, Phase};
