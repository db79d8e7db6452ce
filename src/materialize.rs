//! Expanding a history (base snapshot + diffs) into an array of
//! compacted per-frame snapshots, and subsampling that array for a
//! caller-requested `(depth, freq)`.
//!
//! Grounded on `examples/original_source/internal/orderbook/hist.go`
//! (`ToSmallArray`) and `internal/orderbook/small.go` (`Cut`).

use crate::model::{DepthDiff, OrderBook, OrderBookSmall};

/// The depth requested internally while materializing a blob, before
/// any caller-facing `depth` cut is applied.
pub const MATERIALIZE_DEPTH: usize = 5000;

/// Produces `out[0..=diffs.len()]` where `out[0]` is `start` compacted
/// and `out[i] = apply(out[i - 1], diffs[i - 1])` compacted. The
/// running snapshot is mutated in place; each output element is an
/// independent compacted copy.
pub fn materialize(start: &OrderBook, diffs: &[DepthDiff]) -> Vec<OrderBookSmall> {
    let mut out = Vec::with_capacity(diffs.len() + 1);
    let mut current = start.clone();

    let mut small = current.to_small();
    small.sort_and_cut(MATERIALIZE_DEPTH);
    out.push(small);

    for diff in diffs {
        current.apply_diff(diff);
        let mut small = current.to_small();
        small.sort_and_cut(MATERIALIZE_DEPTH);
        out.push(small);
    }

    out
}

/// Subsamples a materialized array with stride `10 / freq`
/// (`freq` is `1` or `10`; frames are produced at 10 Hz, so `freq=1`
/// keeps every tenth frame and `freq=10` keeps every frame), and cuts
/// each retained snapshot to `limit` per side. Output length is
/// `floor(input_len / stride)`; order is preserved.
pub fn cut(array: &[OrderBookSmall], limit: usize, freq: u32) -> Vec<OrderBookSmall> {
    let stride = (10 / freq.max(1)) as usize;
    let out_len = array.len() / stride.max(1);

    (0..out_len).map(|i| array[i * stride].cut(limit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DepthDiff;
    use ordered_float::OrderedFloat;

    fn diff_at(time: i64) -> DepthDiff {
        let mut d = DepthDiff {
            time,
            ..Default::default()
        };
        d.bids.insert(OrderedFloat(1.0), 1.0);
        d
    }

    /// Invariant 2: N diffs produce N+1 snapshots with the expected
    /// timestamps.
    #[test]
    fn materialize_produces_n_plus_one_frames() {
        let start = OrderBook::new(100);
        let diffs: Vec<_> = [110, 120, 130].into_iter().map(diff_at).collect();

        let out = materialize(&start, &diffs);

        assert_eq!(out.len(), 4);
        assert_eq!(
            out.iter().map(|s| s.time).collect::<Vec<_>>(),
            vec![100, 110, 120, 130]
        );
    }

    #[test]
    fn materialize_with_no_diffs_yields_just_the_base() {
        let start = OrderBook::new(5);
        let out = materialize(&start, &[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].time, 5);
    }

    /// Invariant 4: freq=10 is a no-op; freq=1 keeps every tenth frame.
    #[test]
    fn cut_is_length_deterministic() {
        let frames: Vec<OrderBookSmall> = (0..30)
            .map(|i| OrderBookSmall {
                time: i * 10,
                ..Default::default()
            })
            .collect();

        let unchanged = cut(&frames, 5000, 10);
        assert_eq!(unchanged.len(), 30);

        let decimated = cut(&frames, 5000, 1);
        assert_eq!(decimated.len(), 3);
        assert_eq!(
            decimated.iter().map(|s| s.time).collect::<Vec<_>>(),
            vec![0, 100, 200]
        );
    }

    #[test]
    fn cut_truncates_each_retained_frame() {
        let mut frame = OrderBookSmall {
            time: 0,
            ..Default::default()
        };
        frame.bids = vec![(1.0, 1.0), (2.0, 1.0), (3.0, 1.0)];
        let frames = vec![frame];

        let out = cut(&frames, 2, 10);
        assert_eq!(out[0].bids, vec![(2.0, 1.0), (3.0, 1.0)]);
    }
}
