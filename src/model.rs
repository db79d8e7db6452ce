//! Order-book snapshots, depth-diffs, and the compacted wire shape
//! returned to callers.
//!
//! Grounded on `examples/original_source/internal/orderbook/{orderbook,pricelevel,small}.go`.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A price, hashable/orderable because `f32` alone is neither.
pub type Price = OrderedFloat<f32>;

/// Price ladder: price -> aggregate volume at that price. Keyed by a
/// `BTreeMap` so ascending-price order is a representation invariant
/// rather than a sort performed later.
pub type DepthLevel = BTreeMap<Price, f32>;

/// One `(price, volume)` pair in a compacted snapshot.
pub type PriceLevel = (f32, f32);

/// A full snapshot: a point in time plus two price ladders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    pub time: i64,
    pub bids: DepthLevel,
    pub asks: DepthLevel,
}

/// An incremental edit to a snapshot. A `volume` of zero deletes the
/// price; otherwise the price is set to the new volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthDiff {
    pub time: i64,
    pub bids: DepthLevel,
    pub asks: DepthLevel,
}

impl OrderBook {
    pub fn new(time: i64) -> Self {
        Self {
            time,
            bids: DepthLevel::new(),
            asks: DepthLevel::new(),
        }
    }

    /// Applies `diff` in place: per-price upsert-or-delete, then
    /// adopts the diff's timestamp. O(|diff|).
    pub fn apply_diff(&mut self, diff: &DepthDiff) {
        apply_side(&mut self.bids, &diff.bids);
        apply_side(&mut self.asks, &diff.asks);
        self.time = diff.time;
    }

    /// Converts to the compacted wire shape. Because `DepthLevel` is a
    /// `BTreeMap`, both sides already come out ascending by price —
    /// the "allocate, then sort" step of a naive port collapses into
    /// a single pass.
    pub fn to_small(&self) -> OrderBookSmall {
        OrderBookSmall {
            time: self.time,
            bids: self.bids.iter().map(|(p, v)| (p.into_inner(), *v)).collect(),
            asks: self.asks.iter().map(|(p, v)| (p.into_inner(), *v)).collect(),
        }
    }
}

fn apply_side(side: &mut DepthLevel, edits: &DepthLevel) {
    for (price, volume) in edits {
        if *volume == 0.0 {
            side.remove(price);
        } else {
            side.insert(*price, *volume);
        }
    }
}

/// A compacted, depth-limited snapshot: both sides are plain
/// ascending-by-price arrays. This is the type returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSmall {
    pub time: i64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderBookSmall {
    /// Sorts each side ascending by price and truncates: bids retain
    /// the `limit` highest prices (the tail of the ascending array),
    /// asks retain the `limit` lowest (the head). A hard cap; sides
    /// shorter than `limit` are left as-is. Idempotent.
    pub fn sort_and_cut(&mut self, limit: usize) {
        self.bids.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.asks.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.truncate_sorted(limit);
    }

    /// Truncates assuming both sides are already sorted ascending by
    /// price. Used by `Cut` (materialize.rs), which re-truncates
    /// snapshots that are already in sorted order and doesn't pay for
    /// a redundant sort.
    pub fn truncate_sorted(&mut self, limit: usize) {
        if self.bids.len() > limit {
            let drop = self.bids.len() - limit;
            self.bids.drain(0..drop);
        }
        if self.asks.len() > limit {
            self.asks.truncate(limit);
        }
    }

    /// Returns a cut copy, leaving `self` untouched.
    pub fn cut(&self, limit: usize) -> OrderBookSmall {
        let mut out = self.clone();
        out.truncate_sorted(limit);
        out
    }
}

/// `(symbol, start, diffs)`: a base snapshot plus an ordered,
/// non-decreasing-in-time sequence of diffs. `diffs[0]` applies to
/// `start`. The materialized form has `diffs.len() + 1` snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookHistory {
    pub symbol: String,
    pub start: OrderBook,
    pub diffs: Vec<DepthDiff>,
}

/// Returns the smallest `i` such that `array[i].time <= t <=
/// array[i + 1].time`, or `None` if no such bracketing pair exists
/// (array too short, or `t` outside its range). `array` is assumed
/// monotonically non-decreasing in time.
pub fn find_time_index(array: &[OrderBookSmall], t: i64) -> Option<usize> {
    if array.len() < 2 {
        return None;
    }
    array
        .windows(2)
        .position(|w| w[0].time <= t && t <= w[1].time)
}
