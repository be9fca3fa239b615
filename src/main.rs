use std::{env, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use wallet_dashboard::offline::{FsOrigin, MemoryStore, OfflineCache};
use wallet_dashboard::{AppState, load_data, resolve_data_path, router};

const SEED_URLS: [&str; 3] = ["/assets/app.css", "/assets/app.js", "/assets/offline.html"];
const OFFLINE_URL: &str = "/assets/offline.html";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let data_path = resolve_data_path()?;
    if let Some(parent) = data_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let data = load_data(&data_path).await;

    let assets = build_asset_cache().await?;
    let state = AppState::new(data_path, data, assets);
    let app = router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds, installs, and activates the offline asset cache. The store name
/// is the deploy-time version; bumping `ASSET_VERSION` makes activation
/// purge the previous generation. If the asset directory is unusable at
/// boot, a snapshot left by a previous session of the same version keeps
/// the dashboard serving cached assets.
async fn build_asset_cache()
-> Result<Arc<OfflineCache<MemoryStore, FsOrigin>>, Box<dyn std::error::Error>> {
    let version = env::var("ASSET_VERSION").unwrap_or_else(|_| "v1".to_string());
    let asset_root = env::var("ASSET_ROOT").unwrap_or_else(|_| "assets".to_string());
    let snapshot_path = env::var("ASSET_CACHE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/asset_cache.json"));
    if let Some(parent) = snapshot_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let store = MemoryStore::with_snapshot(snapshot_path).await;
    let origin = FsOrigin::new("/assets", asset_root);
    let cache = OfflineCache::new(
        store,
        origin,
        format!("wallet-assets-{version}"),
        SEED_URLS.iter().map(|url| url.to_string()).collect(),
        OFFLINE_URL,
    );

    if let Err(err) = cache.install().await {
        warn!("asset install failed ({err}), trying the snapshot store");
        cache.resume().await?;
    }
    cache.activate().await?;

    Ok(Arc::new(cache))
}
