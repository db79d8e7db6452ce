//! The per-symbol catalog: the ordered list of blobs backing a symbol,
//! parsed from object keys, plus the lookups `SymbolCache` needs to
//! turn a timestamp into a blob and back.
//!
//! Grounded on `examples/original_source/cmd/api/cache/index.go`.

use crate::codec::Format;
use crate::error::CacheError;

/// One blob's catalog entry: its key, wire format, the inclusive
/// `[start, end]` millisecond range it covers, and whether its bytes
/// have been pulled into the LRU.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexElement {
    pub key: String,
    pub format: Format,
    pub start: i64,
    pub end: i64,
    pub downloaded: bool,
}

/// A symbol's catalog: `IndexElement`s sorted ascending by `start`
/// (the source's `Less` compares a single index to
/// itself and never actually sorts; ascending-by-start is the only
/// order `FindKey`'s linear scan and `GetNext` make sense under).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Index(pub Vec<IndexElement>);

/// Parses one object key of the form `<symbol>/<start>-<end>.<format>`
/// into an `IndexElement`. Returns `None` (rather than erroring the
/// whole listing) for any key that doesn't match, so one bad object
/// doesn't take a symbol's catalog down.
fn parse_key(object_key: &str) -> Option<IndexElement> {
    let without_symbol = object_key.split('/').nth(1)?;
    let (range, format_ext) = without_symbol.split_once('.')?;
    let (start_str, end_str) = range.split_once('-')?;

    Some(IndexElement {
        key: without_symbol.to_string(),
        format: Format::from_extension(format_ext)?,
        start: start_str.parse().ok()?,
        end: end_str.parse().ok()?,
        downloaded: false,
    })
}

impl Index {
    /// Builds a fresh catalog from the full list of object keys under
    /// a symbol's prefix, sorted ascending by `start`.
    pub fn new(object_keys: impl IntoIterator<Item = String>) -> Self {
        let mut elements: Vec<IndexElement> =
            object_keys.into_iter().filter_map(|k| parse_key(&k)).collect();
        elements.sort_by_key(|e| e.start);
        Index(elements)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Carries `downloaded` bits from `old` into `self` for elements
    /// present in both, matched by `start` (the
    /// source indexes both sides by the same loop variable `i`, which
    /// is wrong whenever the two catalogs diverge before the matching
    /// pair; this walks both catalogs by their own pointers).
    pub fn transfer_downloaded(&mut self, old: &Index) {
        let (mut new_i, mut old_j) = (0usize, 0usize);
        while new_i < self.0.len() && old_j < old.0.len() {
            let new_start = self.0[new_i].start;
            let old_start = old.0[old_j].start;
            if new_start < old_start {
                new_i += 1;
            } else if new_start > old_start {
                old_j += 1;
            } else {
                self.0[new_i].downloaded = old.0[old_j].downloaded;
                new_i += 1;
                old_j += 1;
            }
        }
    }

    /// Finds the element whose `[start, end]` contains `t`, and its
    /// index. Linear scan, as in the source; catalogs are small enough
    /// (one per symbol, one entry per ~hour of history) that this
    /// isn't worth a binary search.
    pub fn find_key(&self, t: i64) -> Option<(&IndexElement, usize)> {
        self.0
            .iter()
            .enumerate()
            .find(|(_, e)| e.start <= t && t <= e.end)
            .map(|(i, e)| (e, i))
    }

    pub fn get(&self, i: usize) -> Option<&IndexElement> {
        self.0.get(i)
    }

    pub fn get_next(&self, i: usize) -> Option<&IndexElement> {
        self.0.get(i + 1)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut IndexElement> {
        self.0.get_mut(i)
    }

    /// The earliest timestamp this catalog can answer for, with a
    /// 100ms margin so a request landing exactly on the first blob's
    /// start isn't rejected by clock skew between producer and reader.
    pub fn earliest_time(&self) -> Result<i64, CacheError> {
        self.0
            .first()
            .map(|e| e.start + 100)
            .ok_or_else(|| CacheError::NotFound { timestamp: i64::MIN })
    }

    /// The latest timestamp this catalog can answer for, mirroring
    /// `earliest_time`'s margin.
    pub fn latest_time(&self) -> Result<i64, CacheError> {
        self.0
            .last()
            .map(|e| e.end - 100)
            .ok_or_else(|| CacheError::NotFound { timestamp: i64::MAX })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<String> {
        vec![
            "btcusdt/200-300.json".to_string(),
            "btcusdt/100-200.bin".to_string(),
            "btcusdt/300-400.msgpack".to_string(),
            "btcusdt/not-a-valid-key".to_string(),
        ]
    }

    #[test]
    fn new_sorts_ascending_and_skips_unparseable_keys() {
        let index = Index::new(keys());
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.0.iter().map(|e| e.start).collect::<Vec<_>>(),
            vec![100, 200, 300]
        );
        assert_eq!(index.0[0].format, Format::Bin);
        assert_eq!(index.0[1].format, Format::Json);
        assert_eq!(index.0[2].format, Format::MsgPack);
    }

    #[test]
    fn find_key_locates_the_bracketing_element() {
        let index = Index::new(keys());
        let (elem, i) = index.find_key(250).unwrap();
        assert_eq!(i, 1);
        assert_eq!(elem.start, 200);
        assert!(index.find_key(1_000_000).is_none());
    }

    #[test]
    fn get_next_returns_the_following_element() {
        let index = Index::new(keys());
        let (_, i) = index.find_key(150).unwrap();
        let next = index.get_next(i).unwrap();
        assert_eq!(next.start, 200);
        assert!(index.get_next(index.len() - 1).is_none());
    }

    #[test]
    fn transfer_downloaded_matches_by_start_across_divergent_catalogs() {
        let mut old = Index::new(keys());
        old.0[0].downloaded = true;
        old.0[2].downloaded = true;

        let mut new_keys = keys();
        new_keys.push("btcusdt/400-500.bin".to_string());
        let mut new = Index::new(new_keys);

        new.transfer_downloaded(&old);

        assert!(new.0[0].downloaded);
        assert!(!new.0[1].downloaded);
        assert!(new.0[2].downloaded);
        assert!(!new.0[3].downloaded);
    }

    #[test]
    fn earliest_and_latest_time_apply_the_margin() {
        let index = Index::new(keys());
        assert_eq!(index.earliest_time().unwrap(), 200);
        assert_eq!(index.latest_time().unwrap(), 300);
    }

    #[test]
    fn empty_catalog_yields_not_found() {
        let index = Index::default();
        assert!(index.earliest_time().is_err());
        assert!(index.latest_time().is_err());
    }
}
