//! HTTP adapter: `GET /get-symbol-list`, `GET /get-symbol-info`,
//! `GET /get-orderbooks`.
//!
//! Grounded on
//! `examples/IndexMaker-indexmaker-backend/src/handlers/index.rs`:
//! typed query/response structs, `impl IntoResponse` for the domain
//! error type, `tracing::info!` around the handler body. Query
//! semantics follow the blob-naming and query-parameter conventions
//! of the object store this cache reads from.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::model::OrderBookSmall;
use crate::time;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "orderbook request failed");
        }

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

pub async fn get_symbol_list(State(state): State<AppState>) -> Result<Json<Vec<String>>, CacheError> {
    tracing::info!("listing known symbols");
    let mut symbols: Vec<String> = state.caches().into_iter().map(|c| c.symbol().to_string()).collect();
    symbols.sort();
    Ok(Json(symbols))
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfoQuery {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct SymbolInfoResponse {
    #[serde(rename = "Start")]
    pub start: String,
    #[serde(rename = "End")]
    pub end: String,
}

pub async fn get_symbol_info(
    State(state): State<AppState>,
    Query(query): Query<SymbolInfoQuery>,
) -> Result<Json<SymbolInfoResponse>, CacheError> {
    tracing::info!(symbol = %query.symbol, "resolving symbol availability window");
    let cache = state.cache_for(&query.symbol)?;
    let (start, end) = cache.get_available_times().await?;

    Ok(Json(SymbolInfoResponse {
        start: time::format_unix_milli(start),
        end: time::format_unix_milli(end),
    }))
}

const MAX_WINDOW_AREA: i64 = 10 * 15 * 100 * 5000;

#[derive(Debug, Deserialize)]
pub struct OrderbooksQuery {
    pub symbol: String,
    pub start: String,
    pub end: Option<String>,
    pub depth: Option<usize>,
    pub freq: Option<u32>,
}

pub async fn get_orderbooks(
    State(state): State<AppState>,
    Query(query): Query<OrderbooksQuery>,
) -> Result<Json<Vec<OrderBookSmall>>, CacheError> {
    let cache = state.cache_for(&query.symbol)?;

    let start = time::parse_datetime_string(&query.start)?;
    let end = match &query.end {
        Some(s) => time::parse_datetime_string(s)?,
        None => start,
    };

    let depth = query.depth.unwrap_or(1000);
    if depth > 5000 {
        return Err(CacheError::Validation(format!("depth {depth} out of range [0, 5000]")));
    }

    let freq = query.freq.unwrap_or(1);
    if freq != 1 && freq != 10 {
        return Err(CacheError::Validation(format!("freq {freq} must be 1 or 10")));
    }

    if (end - start).saturating_mul(depth as i64) > MAX_WINDOW_AREA {
        return Err(CacheError::Validation(
            "requested window is too large: (end - start) * depth exceeds the allowed bound".to_string(),
        ));
    }

    tracing::info!(symbol = %query.symbol, start, end, depth, freq, "selecting orderbook window");

    let snapshots = if start == end {
        vec![cache.select_time(start, depth, freq).await?]
    } else {
        cache.select(start, end, depth, freq).await?
    };

    Ok(Json(snapshots))
}
