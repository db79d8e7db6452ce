// src/lib.rs

pub mod cache;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod handlers;
pub mod lru;
pub mod materialize;
pub mod model;
pub mod store;
pub mod time;

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::SymbolCache;
use crate::error::CacheError;

/// Shared application state: one `SymbolCache` per known symbol,
/// built once at startup from the object store's top-level prefixes.
#[derive(Clone)]
pub struct AppState {
    caches: Arc<HashMap<String, Arc<SymbolCache>>>,
}

impl AppState {
    pub fn new(caches: HashMap<String, Arc<SymbolCache>>) -> Self {
        AppState {
            caches: Arc::new(caches),
        }
    }

    pub fn cache_for(&self, symbol: &str) -> Result<Arc<SymbolCache>, CacheError> {
        self.caches
            .get(symbol)
            .cloned()
            .ok_or_else(|| CacheError::Validation(format!("unknown symbol {symbol}")))
    }

    pub fn caches(&self) -> Vec<Arc<SymbolCache>> {
        self.caches.values().cloned().collect()
    }
}
