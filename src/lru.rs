//! A key-value LRU over materialized blob contents, with the recency
//! list stored as an arena of slots rather than `Rc`/`RefCell` nodes.
//!
//! Grounded on `examples/original_source/cmd/api/cache/lru.go`.
//! The source's `container/list` + raw-pointer recency list doesn't
//! translate directly; reproducing it with `Rc<RefCell<_>>` risks
//! reference cycles. An arena of slots indexed by plain `usize`s
//! sidesteps the cycle/borrow problem entirely.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::materialize;
use crate::model::OrderBookSmall;

struct Slot {
    key: String,
    data: Vec<OrderBookSmall>,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    slots: Vec<Option<Slot>>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    free: Vec<usize>,
    capacity: usize,
}

impl Inner {
    fn detach(&mut self, i: usize) {
        let (prev, next) = {
            let slot = self.slots[i].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, i: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[i].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(i);
        }
        self.head = Some(i);
        if self.tail.is_none() {
            self.tail = Some(i);
        }
    }

    fn move_to_front(&mut self, i: usize) {
        if self.head == Some(i) {
            return;
        }
        self.detach(i);
        self.push_front(i);
    }
}

/// A single symbol's materialized-blob cache. Keys are blob keys
/// (`catalog::IndexElement::key`); values are the fully materialized
/// per-frame snapshot arrays (the output of `materialize`).
pub struct Lru {
    inner: Mutex<Inner>,
}

impl Lru {
    pub fn new(capacity: usize) -> Self {
        Lru {
            inner: Mutex::new(Inner {
                slots: Vec::new(),
                index: HashMap::new(),
                head: None,
                tail: None,
                free: Vec::new(),
                capacity,
            }),
        }
    }

    /// Inserts a freshly materialized blob at the front of the recency
    /// list. Overwrites any existing entry for `key` in place, keeping
    /// its existing slot rather than allocating a new one.
    pub fn insert(&self, key: String, data: Vec<OrderBookSmall>) {
        let mut inner = self.inner.lock();

        if let Some(&i) = inner.index.get(&key) {
            inner.slots[i].as_mut().unwrap().data = data;
            inner.move_to_front(i);
            return;
        }

        let slot = Slot {
            key: key.clone(),
            data,
            prev: None,
            next: None,
        };

        let i = if let Some(free) = inner.free.pop() {
            inner.slots[free] = Some(slot);
            free
        } else {
            inner.slots.push(Some(slot));
            inner.slots.len() - 1
        };

        inner.index.insert(key, i);
        inner.push_front(i);
    }

    /// Marks `key` most-recently-used and returns a depth/frequency
    /// cut of its cached data. `key` must already be present (the
    /// caller downloads-then-inserts before ever calling `select`) —
    /// a miss here is a programming error, not a cache miss.
    pub fn select(&self, key: &str, depth: usize, freq: u32) -> Result<Vec<OrderBookSmall>, crate::error::CacheError> {
        let mut inner = self.inner.lock();
        let &i = inner
            .index
            .get(key)
            .ok_or_else(|| crate::error::CacheError::Programming(format!("key {key} not found in lru")))?;

        inner.move_to_front(i);
        let data = &inner.slots[i].as_ref().unwrap().data;
        Ok(materialize::cut(data, depth, freq))
    }

    /// Evicts entries from the back of the recency list until the
    /// cache is at or under capacity, returning the evicted keys so
    /// the caller can clear their catalog `downloaded` bits.
    pub fn clear(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        let len = inner.index.len();
        if len <= inner.capacity {
            return Vec::new();
        }

        let drop_count = len - inner.capacity;
        let mut dropped = Vec::with_capacity(drop_count);

        for _ in 0..drop_count {
            let Some(tail) = inner.tail else { break };
            inner.detach(tail);
            let slot = inner.slots[tail].take().unwrap();
            inner.index.remove(&slot.key);
            inner.free.push(tail);
            dropped.push(slot.key);
        }

        dropped
    }

    /// Whether the cache currently holds more entries than capacity
    /// (a scheduled `clear` is due).
    pub fn over_capacity(&self) -> bool {
        let inner = self.inner.lock();
        inner.index.len() > inner.capacity
    }

    /// All keys currently resident, for diagnostics.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.index.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: i64) -> OrderBookSmall {
        OrderBookSmall {
            time: t,
            ..Default::default()
        }
    }

    #[test]
    fn select_cuts_via_materialize_and_marks_recent() {
        let lru = Lru::new(10);
        lru.insert("a".into(), vec![frame(0), frame(10)]);
        let out = lru.select("a", 5000, 10).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn select_missing_key_is_a_programming_error() {
        let lru = Lru::new(10);
        let err = lru.select("missing", 5000, 10).unwrap_err();
        assert!(matches!(err, crate::error::CacheError::Programming(_)));
    }

    #[test]
    fn clear_evicts_least_recently_used_down_to_capacity() {
        let lru = Lru::new(2);
        lru.insert("a".into(), vec![frame(0)]);
        lru.insert("b".into(), vec![frame(0)]);
        lru.insert("c".into(), vec![frame(0)]);

        assert!(lru.over_capacity());
        let dropped = lru.clear();
        assert_eq!(dropped, vec!["a".to_string()]);
        assert!(!lru.over_capacity());

        let mut remaining = lru.keys();
        remaining.sort();
        assert_eq!(remaining, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn touching_a_key_protects_it_from_eviction() {
        let lru = Lru::new(2);
        lru.insert("a".into(), vec![frame(0)]);
        lru.insert("b".into(), vec![frame(0)]);
        lru.select("a", 5000, 10).unwrap();
        lru.insert("c".into(), vec![frame(0)]);

        let dropped = lru.clear();
        assert_eq!(dropped, vec!["b".to_string()]);
    }

    #[test]
    fn reinserting_an_existing_key_reuses_its_slot_and_refreshes_data() {
        let lru = Lru::new(10);
        lru.insert("a".into(), vec![frame(0)]);
        lru.insert("a".into(), vec![frame(0), frame(10), frame(20)]);

        let out = lru.select("a", 5000, 10).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(lru.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn clear_with_room_to_spare_evicts_nothing() {
        let lru = Lru::new(10);
        lru.insert("a".into(), vec![frame(0)]);
        assert!(lru.clear().is_empty());
    }
}
