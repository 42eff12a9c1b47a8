// src/engine/cache.rs
//
// Caller-owned cache of encoded results.
//
// Keyed by the pipeline's operation key plus a SHA-256 of the input bytes,
// so identical uploads with identical settings skip decode/process/encode.
// Bounded by entry count and total bytes; the least recently used entry goes
// first. The pipeline never owns a cache; callers pass one in.

use crate::error::Result;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

pub const DEFAULT_MAX_ENTRIES: usize = 128;
pub const DEFAULT_MAX_BYTES: usize = 256 * 1024 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    digest: [u8; 32],
}

impl CacheKey {
    pub fn new(operation: impl Into<String>, input: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(input));
        Self {
            operation: operation.into(),
            digest,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry {
    data: Arc<[u8]>,
    last_used: u64,
}

#[derive(Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    clock: u64,
    bytes: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_lru(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone());
        match oldest.and_then(|k| self.entries.remove(&k)) {
            Some(entry) => {
                self.bytes -= entry.data.len();
                self.evictions += 1;
                true
            }
            None => false,
        }
    }
}

pub struct ProcessedImageCache {
    max_entries: usize,
    max_bytes: usize,
    state: Mutex<State>,
}

impl Default for ProcessedImageCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_BYTES)
    }
}

impl std::fmt::Debug for ProcessedImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessedImageCache")
            .field("max_entries", &self.max_entries)
            .field("max_bytes", &self.max_bytes)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ProcessedImageCache {
    /// A zero `max_entries` or `max_bytes` disables storage; lookups always miss.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            max_entries,
            max_bytes,
            state: Mutex::new(State::default()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<[u8]>> {
        let mut state = self.state.lock();
        let now = state.tick();
        let found = state.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            Arc::clone(&entry.data)
        });
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    /// Store `data` under `key`, evicting older entries as needed.
    ///
    /// A result larger than the whole byte budget is returned but not kept.
    pub fn insert(&self, key: CacheKey, data: Vec<u8>) -> Arc<[u8]> {
        let data: Arc<[u8]> = data.into();
        if self.max_entries == 0 || data.len() > self.max_bytes {
            return data;
        }

        let mut state = self.state.lock();
        let now = state.tick();
        if let Some(previous) = state.entries.remove(&key) {
            state.bytes -= previous.data.len();
        }
        while state.entries.len() >= self.max_entries
            || state.bytes + data.len() > self.max_bytes
        {
            if !state.evict_lru() {
                break;
            }
        }
        state.bytes += data.len();
        trace!(
            operation = key.operation(),
            bytes = data.len(),
            total = state.bytes,
            "cache insert"
        );
        state.entries.insert(
            key,
            Entry {
                data: Arc::clone(&data),
                last_used: now,
            },
        );
        data
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// `compute` runs without the lock held; concurrent misses on the same
    /// key may both compute, and the last insert wins. Errors are not cached.
    pub fn get_or_try_insert_with<F>(&self, key: CacheKey, compute: F) -> Result<Arc<[u8]>>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let data = compute()?;
        Ok(self.insert(key, data))
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.bytes = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            bytes: state.bytes,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterError;

    fn key(op: &str, input: &[u8]) -> CacheKey {
        CacheKey::new(op, input)
    }

    #[test]
    fn key_depends_on_operation_and_content() {
        assert_eq!(key("ocr", b"abc"), key("ocr", b"abc"));
        assert_ne!(key("ocr", b"abc"), key("ocr", b"abd"));
        assert_ne!(key("ocr", b"abc"), key("flip", b"abc"));
    }

    #[test]
    fn evicts_least_recently_used_by_count() {
        let cache = ProcessedImageCache::new(2, 1024);
        cache.insert(key("a", b"1"), vec![1]);
        cache.insert(key("b", b"1"), vec![2]);
        // touch "a" so "b" becomes the oldest
        assert!(cache.get(&key("a", b"1")).is_some());
        cache.insert(key("c", b"1"), vec![3]);

        assert!(cache.get(&key("b", b"1")).is_none());
        assert_eq!(cache.get(&key("a", b"1")).as_deref(), Some(&[1u8][..]));
        assert_eq!(cache.get(&key("c", b"1")).as_deref(), Some(&[3u8][..]));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn respects_byte_budget() {
        let cache = ProcessedImageCache::new(10, 10);
        cache.insert(key("a", b""), vec![0; 4]);
        cache.insert(key("b", b""), vec![0; 4]);
        cache.insert(key("c", b""), vec![0; 4]);
        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.bytes, 8);
        assert!(cache.get(&key("a", b"")).is_none());

        // larger than the whole budget: returned, not stored
        let big = cache.insert(key("huge", b""), vec![0; 11]);
        assert_eq!(big.len(), 11);
        assert!(cache.get(&key("huge", b"")).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn replacing_a_key_updates_bytes() {
        let cache = ProcessedImageCache::new(4, 100);
        cache.insert(key("a", b""), vec![0; 10]);
        cache.insert(key("a", b""), vec![0; 3]);
        assert_eq!(cache.stats().bytes, 3);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().bytes, 0);
    }

    #[test]
    fn compute_runs_once_and_errors_are_not_cached() {
        let cache = ProcessedImageCache::default();
        let mut calls = 0;
        for _ in 0..3 {
            let out = cache
                .get_or_try_insert_with(key("ocr", b"img"), || {
                    calls += 1;
                    Ok(vec![9, 9])
                })
                .unwrap();
            assert_eq!(&*out, &[9, 9]);
        }
        assert_eq!(calls, 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));

        let err = cache.get_or_try_insert_with(key("bad", b"img"), || {
            Err(RasterError::decode_failed("nope"))
        });
        assert!(err.is_err());
        assert!(cache.get(&key("bad", b"img")).is_none());
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = ProcessedImageCache::new(0, 1024);
        cache.insert(key("a", b""), vec![1]);
        assert!(cache.is_empty());
    }
}
