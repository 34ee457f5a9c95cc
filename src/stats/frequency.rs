//! Bounded frequency counter with top-share eviction.
//!
//! Exact counts while the domain fits the cap; once the cap is exceeded the
//! counter keeps only the top 80% of entries by count, so long-tail
//! frequencies degrade to lower bounds. Callers quoting percentages over the
//! full stream must use their own total, not [`BoundedFrequencyCounter::total_count`].

use std::collections::HashMap;
use std::hash::Hash;

/// Share of the cap retained after an eviction pass.
const RETAIN_RATIO: f64 = 0.8;

#[derive(Debug, Clone)]
struct Slot {
    count: u64,
    /// Monotone stamp used to break count ties in first-seen order.
    inserted: u64,
}

/// Hash-map counter holding at most `cap` distinct keys.
#[derive(Debug, Clone)]
pub struct BoundedFrequencyCounter<K: Eq + Hash + Clone> {
    slots: HashMap<K, Slot>,
    cap: usize,
    next_stamp: u64,
    evicted: bool,
}

impl<K: Eq + Hash + Clone> BoundedFrequencyCounter<K> {
    pub fn new(cap: usize) -> Self {
        Self {
            slots: HashMap::new(),
            cap: cap.max(1),
            next_stamp: 0,
            evicted: false,
        }
    }

    pub fn update(&mut self, key: K) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: K, by: u64) {
        if let Some(slot) = self.slots.get_mut(&key) {
            slot.count += by;
            return;
        }
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.slots.insert(
            key,
            Slot {
                count: by,
                inserted: stamp,
            },
        );
        if self.slots.len() > self.cap {
            self.evict();
        }
    }

    /// Drop everything but the top `floor(0.8 * cap)` entries by count,
    /// ties broken by insertion order.
    fn evict(&mut self) {
        let keep = ((self.cap as f64) * RETAIN_RATIO).floor() as usize;
        let keep = keep.max(1);
        let mut entries: Vec<(K, Slot)> = self.slots.drain().collect();
        entries.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.inserted.cmp(&b.1.inserted))
        });
        entries.truncate(keep);
        self.slots = entries.into_iter().collect();
        self.evicted = true;
    }

    pub fn count(&self, key: &K) -> u64 {
        self.slots.get(key).map_or(0, |s| s.count)
    }

    /// Top `k` entries in descending count order, ties by insertion order.
    pub fn top_k(&self, k: usize) -> Vec<(K, u64)> {
        let mut entries: Vec<(&K, &Slot)> = self.slots.iter().collect();
        entries.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.inserted.cmp(&b.1.inserted))
        });
        entries
            .into_iter()
            .take(k)
            .map(|(k, s)| (k.clone(), s.count))
            .collect()
    }

    /// Sum of retained counts. Underestimates the true stream total once
    /// eviction has occurred.
    pub fn total_count(&self) -> u64 {
        self.slots.values().map(|s| s.count).sum()
    }

    /// Number of distinct retained keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Whether any entries have been dropped; retained counts are lower
    /// bounds from then on.
    pub fn has_evicted(&self) -> bool {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.slots.iter().map(|(k, s)| (k, s.count))
    }

    /// Merge retained counts from another counter under the same cap.
    pub fn merge(&mut self, other: &Self) {
        for (key, count) in other.iter() {
            self.add(key.clone(), count);
        }
        self.evicted |= other.evicted;
    }

    /// Rough retained-bytes estimate; `key_bytes` sizes one key's payload.
    pub fn estimated_bytes(&self, key_bytes: impl Fn(&K) -> usize) -> usize {
        let entry_overhead = std::mem::size_of::<Slot>() + std::mem::size_of::<K>() + 16;
        std::mem::size_of::<Self>()
            + self
                .slots
                .keys()
                .map(|k| entry_overhead + key_bytes(k))
                .sum::<usize>()
    }
}
