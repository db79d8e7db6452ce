//! `SymbolCache`: one symbol's catalog + LRU, and the window-stitching
//! `select` operation built on top of them.
//!
//! Grounded on `examples/original_source/cmd/api/cache/cache.go`
//! (core logic) and `examples/IndexMaker-indexmaker-backend/src/jobs/category_sync.rs`
//! (the `tokio::spawn` + `tokio::time::interval` periodic-task shape,
//! logged and non-propagating on error — reused as the scheduling
//! idiom for catalog refresh and LRU eviction).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::catalog::{Index, IndexElement};
use crate::codec;
use crate::error::CacheError;
use crate::lru::Lru;
use crate::materialize;
use crate::model::{find_time_index, OrderBookSmall};
use crate::store::BlobStore;

pub struct SymbolCache {
    store: BlobStore,
    symbol: String,
    index: Mutex<Index>,
    lru: Lru,
}

impl SymbolCache {
    /// Builds a catalog from the store's current contents for
    /// `symbol` and an empty LRU of the given capacity.
    pub async fn new(store: BlobStore, symbol: String, capacity: usize) -> Result<Self, CacheError> {
        let keys = store.list_keys(&symbol).await?;
        Ok(SymbolCache {
            store,
            symbol,
            index: Mutex::new(Index::new(keys)),
            lru: Lru::new(capacity),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Re-lists the store and replaces the catalog, carrying
    /// `downloaded` bits across for blobs present in both listings.
    pub async fn update_index(&self) -> Result<(), CacheError> {
        let keys = self.store.list_keys(&self.symbol).await?;
        let mut new_index = Index::new(keys);
        let mut index = self.index.lock().await;
        new_index.transfer_downloaded(&index);
        *index = new_index;
        Ok(())
    }

    /// Spawns a background task that refreshes the catalog every
    /// `period`. Failures are logged, never propagated — a stale
    /// catalog is preferable to a dead refresh loop.
    pub fn schedule_update_index(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = self.update_index().await {
                    tracing::warn!(symbol = %self.symbol, error = %e, "failed to refresh catalog");
                }
            }
        });
    }

    /// Spawns a background task that runs `clear_once` every `period`.
    pub fn schedule_clear(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.clear_once().await;
            }
        });
    }

    /// Downloads and materializes the blob at `pos` if it isn't already,
    /// marking it downloaded in place, and returns its (now current)
    /// catalog entry. Takes the catalog guard so the whole
    /// check-download-insert sequence runs under one held lock: a second
    /// caller racing on the same symbol blocks on `index.lock().await`
    /// until this completes, then observes `downloaded == true` and
    /// skips the download rather than racing it.
    async fn ensure_downloaded(&self, index: &mut Index, pos: usize) -> Result<IndexElement, CacheError> {
        let elem = index
            .get(pos)
            .cloned()
            .ok_or_else(|| CacheError::Programming(format!("catalog position {pos} out of range")))?;

        if elem.downloaded {
            return Ok(elem);
        }

        let bytes = self.store.get(&self.symbol, &elem.key).await?;
        let history = codec::decode(&bytes, elem.format)?;
        let data = materialize::materialize(&history.start, &history.diffs);
        self.lru.insert(elem.key.clone(), data);

        let updated = index.get_mut(pos).expect("position checked above");
        updated.downloaded = true;
        Ok(updated.clone())
    }

    /// Evicts over-capacity LRU entries and clears their catalog
    /// `downloaded` bits so a later `select` re-downloads them.
    pub async fn clear_once(&self) {
        let dropped = self.lru.clear();
        if dropped.is_empty() {
            return;
        }

        let mut index = self.index.lock().await;
        for elem in index.0.iter_mut() {
            if dropped.contains(&elem.key) {
                elem.downloaded = false;
            }
        }
    }

    /// Returns the depth/freq cut of the single blob covering `t`, or
    /// an empty array if no blob covers it (matches the source's
    /// `SelectWindow`, which signals "not found" by an empty result
    /// rather than an error here). The catalog lock is held from the
    /// lookup through the download, so a concurrent call for the same
    /// `t` either finds the entry already downloaded or queues behind
    /// the one in flight.
    pub async fn select_window(&self, t: i64, depth: usize, freq: u32) -> Result<Vec<OrderBookSmall>, CacheError> {
        let mut index = self.index.lock().await;
        let Some(pos) = index.find_key(t).map(|(_, i)| i) else {
            return Ok(Vec::new());
        };

        let elem = self.ensure_downloaded(&mut index, pos).await?;
        drop(index);
        self.lru.select(&elem.key, depth, freq)
    }

    /// The single snapshot bracketing `t`.
    pub async fn select_time(&self, t: i64, depth: usize, freq: u32) -> Result<OrderBookSmall, CacheError> {
        let window = self.select_window(t, depth, freq).await?;
        find_time_index(&window, t)
            .map(|i| window[i].clone())
            .ok_or(CacheError::NotFound { timestamp: t })
    }

    /// `(earliest, latest)` Unix-millisecond bounds this catalog can
    /// currently answer for.
    pub async fn get_available_times(&self) -> Result<(i64, i64), CacheError> {
        let index = self.index.lock().await;
        Ok((index.earliest_time()?, index.latest_time()?))
    }

    /// Keys currently resident in the LRU, for diagnostics.
    pub fn get_info(&self) -> Vec<String> {
        self.lru.keys()
    }

    /// Returns the depth/freq-cut snapshots spanning `[t1, t2]`,
    /// stitched across as many blobs as the range requires.
    ///
    /// Each blob's materialized array shares its first frame with the
    /// previous blob's last frame (the base snapshot of blob `n+1` is
    /// the same point in time as the final diffed snapshot of blob
    /// `n`), so every window after the first drops its frame 0 before
    /// concatenating. The first window is trimmed to frames at or
    /// after `t1`; the last is trimmed to frames at or before `t2` —
    /// for a single-window selection both trims apply to the same
    /// window, which is exactly a direct `[t1, t2]` range filter.
    ///
    /// The catalog lock is held for the entire stitch, across every
    /// blob's download in the loop below, not just each lookup — one
    /// coarse lock over the whole query, per `select_window`.
    pub async fn select(
        &self,
        t1: i64,
        t2: i64,
        depth: usize,
        freq: u32,
    ) -> Result<Vec<OrderBookSmall>, CacheError> {
        let mut windows: Vec<Vec<OrderBookSmall>> = Vec::new();
        let mut index = self.index.lock().await;

        let Some(mut pos) = index.find_key(t1).map(|(_, i)| i) else {
            return Err(CacheError::NotFound { timestamp: t1 });
        };

        loop {
            let elem = self.ensure_downloaded(&mut index, pos).await?;
            windows.push(self.lru.select(&elem.key, depth, freq)?);

            if elem.end >= t2 {
                break;
            }

            match index.get_next(pos) {
                Some(_) => pos += 1,
                None => return Err(CacheError::NotFound { timestamp: t2 }),
            }
        }
        drop(index);

        let last_idx = windows.len() - 1;
        let mut out = Vec::new();
        for (idx, window) in windows.iter().enumerate() {
            let is_first = idx == 0;
            let is_last = idx == last_idx;

            let mut slice: &[OrderBookSmall] = if is_first {
                window
            } else {
                &window[1.min(window.len())..]
            };

            if is_first {
                let from = slice.iter().position(|f| f.time >= t1).unwrap_or(slice.len());
                slice = &slice[from..];
            }
            if is_last {
                let to = slice.iter().rposition(|f| f.time <= t2).map(|i| i + 1).unwrap_or(0);
                slice = &slice[..to];
            }

            out.extend_from_slice(slice);
        }

        Ok(out)
    }
}
