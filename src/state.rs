use crate::models::{LedgerData, PendingCheckout};
use crate::offline::{FsOrigin, MemoryStore, OfflineCache};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

pub type AssetCache = OfflineCache<MemoryStore, FsOrigin>;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub data: Arc<Mutex<LedgerData>>,
    pub checkouts: Arc<Mutex<HashMap<String, PendingCheckout>>>,
    pub assets: Arc<AssetCache>,
}

impl AppState {
    pub fn new(data_path: PathBuf, data: LedgerData, assets: Arc<AssetCache>) -> Self {
        Self {
            data_path,
            data: Arc::new(Mutex::new(data)),
            checkouts: Arc::new(Mutex::new(HashMap::new())),
            assets,
        }
    }
}
