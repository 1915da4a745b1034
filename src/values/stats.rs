use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::compression::pack::PackCodec;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SlotNo;

/// Aggregate statistics for one value slot.
///
/// `freq` counts the documents with a non-empty value in the slot;
/// `lower_bound` and `upper_bound` bracket the stored values
/// lexicographically. Deletions only decrement `freq`, so the bounds may be
/// loose (a superset of the true range) until the slot is next written or
/// `freq` reaches zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStats {
    pub freq: u32,
    pub lower_bound: Vec<u8>,
    pub upper_bound: Vec<u8>,
}

impl ValueStats {
    pub fn clear(&mut self) {
        self.freq = 0;
        self.lower_bound.clear();
        self.upper_bound.clear();
    }
}

/// Encode a statistics record: `pack_uint(freq) || pack_string(lower) ||
/// upper`. Empty values are never stored, so the bounds are never empty and
/// an equal upper bound can be left off entirely.
pub fn encode_value_stats(stats: &ValueStats) -> Vec<u8> {
    let mut tag = Vec::new();
    PackCodec::pack_uint(&mut tag, stats.freq as u64);
    PackCodec::pack_string(&mut tag, &stats.lower_bound);
    if stats.upper_bound != stats.lower_bound {
        tag.extend_from_slice(&stats.upper_bound);
    }
    tag
}

/// Decode a statistics record. An empty tail means the bounds are equal.
pub fn decode_value_stats(tag: &[u8], stats: &mut ValueStats) -> Result<()> {
    let mut p = tag;
    let freq = PackCodec::unpack_uint(&mut p)
        .map_err(|_| Error::corrupt("incomplete stats item in value table"))?;
    if freq > u32::MAX as u64 {
        return Err(Error::new(
            ErrorKind::Range,
            "frequency statistic in value table is too large".to_string(),
        ));
    }
    stats.freq = freq as u32;
    stats.lower_bound = PackCodec::unpack_string(&mut p)
        .map_err(|_| Error::corrupt("incomplete stats item in value table"))?
        .to_vec();
    if p.is_empty() {
        stats.upper_bound = stats.lower_bound.clone();
    } else {
        stats.upper_bound = p.to_vec();
    }
    Ok(())
}

/// Most-recently-used cache of per-slot statistics.
///
/// A single entry by default: reads repeatedly hitting one slot skip the
/// table lookup, and any statistics write invalidates the cache before
/// touching the table so a failed write cannot leave a stale entry behind.
pub struct StatsCache {
    cache: Mutex<LruCache<SlotNo, ValueStats>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl StatsCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        StatsCache {
            cache: Mutex::new(LruCache::new(cap)),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, slot: SlotNo) -> Option<ValueStats> {
        let mut cache = self.cache.lock();
        if let Some(stats) = cache.get(&slot) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            Some(stats.clone())
        } else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn put(&self, slot: SlotNo, stats: ValueStats) {
        self.cache.lock().put(slot, stats);
    }

    /// Drop the cached entry for `slot` ahead of re-reading it.
    pub fn invalidate(&self, slot: SlotNo) {
        self.cache.lock().pop(&slot);
    }

    /// Drop everything; called before statistics writes.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
