//! The object-store binding: symbol enumeration and per-blob
//! get/put, wrapping an `object_store::ObjectStore`.
//!
//! Grounded on `examples/original_source/internal/s3_client/client.go`
//! (`ListObjects`/`DownloadData`/`UploadData`) and
//! `cmd/api/utils/symbol.go` (`GetSymbolList` — top-level prefixes are
//! symbols).

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::TryStreamExt;
use object_store::path::Path;
use object_store::ObjectStore;

use crate::error::CacheError;

/// Thin wrapper over a shared `ObjectStore`, scoped to the bucket's
/// convention of one top-level prefix per symbol.
#[derive(Clone)]
pub struct BlobStore {
    inner: Arc<dyn ObjectStore>,
}

impl BlobStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        BlobStore { inner }
    }

    /// Lists every object key, symbol-prefix included (e.g.
    /// `"btcusdt/100-200.bin"`), for later parsing into a catalog.
    pub async fn list_keys(&self, symbol: &str) -> Result<Vec<String>, CacheError> {
        let prefix = Path::from(symbol);
        self.inner
            .list(Some(&prefix))
            .map_ok(|meta| meta.location.to_string())
            .try_collect()
            .await
            .map_err(|e| CacheError::Io(e.to_string()))
    }

    /// Enumerates every distinct top-level prefix in the store — the
    /// set of known symbols.
    pub async fn list_symbols(&self) -> Result<Vec<String>, CacheError> {
        let mut symbols = BTreeSet::new();
        let mut stream = self.inner.list(None);
        while let Some(meta) = stream.try_next().await.map_err(|e| CacheError::Io(e.to_string()))? {
            if let Some(symbol) = meta.location.parts().next() {
                symbols.insert(symbol.as_ref().to_string());
            }
        }
        Ok(symbols.into_iter().collect())
    }

    /// Downloads one blob's full bytes.
    pub async fn get(&self, symbol: &str, key: &str) -> Result<Vec<u8>, CacheError> {
        let path = Path::from(format!("{symbol}/{key}"));
        let result = self.inner.get(&path).await.map_err(|e| CacheError::Io(e.to_string()))?;
        let bytes = result.bytes().await.map_err(|e| CacheError::Io(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Uploads one blob's bytes, overwriting any existing object at
    /// that key. Used by tests to seed fixtures; the data-miner (out
    /// of scope here) is the system's real producer.
    pub async fn put(&self, symbol: &str, key: &str, data: Vec<u8>) -> Result<(), CacheError> {
        let path = Path::from(format!("{symbol}/{key}"));
        self.inner
            .put(&path, data.into())
            .await
            .map(|_| ())
            .map_err(|e| CacheError::Io(e.to_string()))
    }
}
