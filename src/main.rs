use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use depthcache::cache::SymbolCache;
use depthcache::handlers;
use depthcache::store::BlobStore;
use depthcache::AppState;

fn default_capacity() -> usize {
    env::var("DEPTHCACHE_LRU_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4)
}

fn duration_env(name: &str, default_secs: u64) -> Duration {
    let secs = env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn build_store() -> Arc<dyn ObjectStore> {
    match env::var("DEPTHCACHE_STORE_PATH") {
        Ok(path) => {
            tracing::info!(path = %path, "using local filesystem object store");
            Arc::new(LocalFileSystem::new_with_prefix(path).expect("DEPTHCACHE_STORE_PATH must be a usable directory"))
        }
        Err(_) => {
            tracing::warn!("DEPTHCACHE_STORE_PATH not set, using an in-memory object store");
            Arc::new(InMemory::new())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,depthcache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let store = BlobStore::new(build_store());
    let capacity = default_capacity();

    let symbols = store.list_symbols().await.expect("failed to list symbols from object store");
    tracing::info!(count = symbols.len(), "discovered symbols");

    let mut caches: HashMap<String, Arc<SymbolCache>> = HashMap::with_capacity(symbols.len());
    for symbol in symbols {
        let cache = SymbolCache::new(store.clone(), symbol.clone(), capacity)
            .await
            .unwrap_or_else(|e| panic!("failed to build cache for symbol {symbol}: {e}"));
        caches.insert(symbol, Arc::new(cache));
    }

    let refresh_period = duration_env("DEPTHCACHE_REFRESH_SECS", 60);
    let clear_period = duration_env("DEPTHCACHE_CLEAR_SECS", 30);
    for cache in caches.values() {
        cache.clone().schedule_update_index(refresh_period);
        cache.clone().schedule_clear(clear_period);
    }

    let state = AppState::new(caches);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/get-symbol-list", get(handlers::get_symbol_list))
        .route("/get-symbol-info", get(handlers::get_symbol_info))
        .route("/get-orderbooks", get(handlers::get_orderbooks))
        .layer(cors)
        .layer(CatchPanicLayer::new())
        .with_state(state);

    let addr = env::var("DEPTHCACHE_ADDR").unwrap_or_else(|_| "0.0.0.0:3002".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
