//! End-to-end HTTP surface tests, built against an in-memory object
//! store and driven with `tower::ServiceExt::oneshot` over the real
//! `Router` — the same pattern used elsewhere in this pack for
//! handler integration tests.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use ordered_float::OrderedFloat;
use tower::ServiceExt;

use depthcache::cache::SymbolCache;
use depthcache::codec::{self, Format};
use depthcache::handlers;
use depthcache::model::{DepthDiff, OrderBook, OrderBookHistory, OrderBookSmall};
use depthcache::store::BlobStore;
use depthcache::AppState;

async fn seed_blob(store: &BlobStore, symbol: &str, start: i64, end: i64) {
    let mut ob = OrderBook::new(start);
    ob.bids.insert(OrderedFloat(100.0), 1.0);
    ob.asks.insert(OrderedFloat(101.0), 1.0);

    let diffs: Vec<DepthDiff> = ((start + 10)..=end)
        .step_by(10)
        .map(|t| DepthDiff {
            time: t,
            ..Default::default()
        })
        .collect();

    let history = OrderBookHistory {
        symbol: symbol.to_string(),
        start: ob,
        diffs,
    };
    let bytes = codec::encode(&history, Format::Bin).unwrap();
    store.put(symbol, &format!("{start}-{end}.bin"), bytes).await.unwrap();
}

async fn build_test_app() -> Router {
    let store = BlobStore::new(Arc::new(object_store::memory::InMemory::new()));
    seed_blob(&store, "btcusdt", 0, 1000).await;

    let cache = SymbolCache::new(store, "btcusdt".to_string(), 10).await.unwrap();

    let mut caches = HashMap::new();
    caches.insert("btcusdt".to_string(), Arc::new(cache));
    let state = AppState::new(caches);

    Router::new()
        .route("/get-symbol-list", get(handlers::get_symbol_list))
        .route("/get-symbol-info", get(handlers::get_symbol_info))
        .route("/get-orderbooks", get(handlers::get_orderbooks))
        .with_state(state)
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn get_symbol_list_returns_known_symbols() {
    let app = build_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/get-symbol-list").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let symbols: Vec<String> = body_json(response).await;
    assert_eq!(symbols, vec!["btcusdt".to_string()]);
}

#[tokio::test]
async fn get_symbol_info_returns_the_availability_window() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-symbol-info?symbol=btcusdt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let info: serde_json::Value = body_json(response).await;
    assert!(info["Start"].is_string());
    assert!(info["End"].is_string());
}

#[tokio::test]
async fn get_symbol_info_for_unknown_symbol_is_a_400() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-symbol-info?symbol=does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_orderbooks_with_a_window_returns_compacted_snapshots() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-orderbooks?symbol=btcusdt&start=1970-01-01T00:00:00.1&end=1970-01-01T00:00:00.5&freq=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let snapshots: Vec<OrderBookSmall> = body_json(response).await;
    assert!(!snapshots.is_empty());
    assert!(snapshots.windows(2).all(|w| w[0].time <= w[1].time));
}

#[tokio::test]
async fn get_orderbooks_with_an_invalid_depth_is_a_400() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-orderbooks?symbol=btcusdt&start=1970-01-01T00:00:00.1&depth=6000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_orderbooks_with_an_invalid_freq_is_a_400() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-orderbooks?symbol=btcusdt&start=1970-01-01T00:00:00.1&freq=7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_orderbooks_for_a_time_outside_the_catalog_is_a_400() {
    let app = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/get-orderbooks?symbol=btcusdt&start=2030-01-01T00:00:00.0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
