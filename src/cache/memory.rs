//! Tier 1: in-memory LRU cache of decoded images.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::{CacheError, TierStats};
use crate::artwork::{CacheKey, CachedImage};

/// Decoded artwork kept in memory, evicted least-recently-used first.
///
/// Bounded by entry count and by the total decoded byte size; an image
/// bigger than the whole byte budget is never stored.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_entries: NonZeroUsize,
    max_bytes: usize,
}

struct Inner {
    entries: LruCache<CacheKey, CachedImage>,
    bytes: usize,
    generation: u64,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` images and `max_bytes` of pixels.
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                bytes: 0,
                generation: 0,
            }),
            max_entries,
            max_bytes,
        }
    }

    /// Look up an image, marking it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Check for an entry without touching its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Store an image.
    pub fn put(&self, key: CacheKey, image: CachedImage) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        self.insert_locked(&mut inner, key, image)
    }

    /// Store an image only if no `clear` happened since `generation` was read.
    pub fn put_since(&self, key: CacheKey, image: CachedImage, generation: u64) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return Err(CacheError::StaleGeneration);
        }
        self.insert_locked(&mut inner, key, image)
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut inner = self.inner.lock();
        match inner.entries.pop(key) {
            Some(old) => {
                inner.bytes -= old.byte_size();
                true
            }
            None => false,
        }
    }

    /// Drop every entry and start a new generation.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.bytes = 0;
        inner.generation += 1;
    }

    /// Current clear generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TierStats {
        let inner = self.inner.lock();
        TierStats {
            entries: inner.entries.len(),
            bytes: inner.bytes as u64,
            max_entries: self.max_entries.get(),
            max_bytes: self.max_bytes as u64,
        }
    }

    fn insert_locked(&self, inner: &mut Inner, key: CacheKey, image: CachedImage) -> Result<(), CacheError> {
        let size = image.byte_size();
        if size > self.max_bytes {
            return Err(CacheError::TooLarge {
                size: size as u64,
                budget: self.max_bytes as u64,
            });
        }

        if let Some(old) = inner.entries.pop(&key) {
            inner.bytes -= old.byte_size();
        }

        while inner.bytes + size > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.bytes -= evicted.byte_size(),
                None => break,
            }
        }

        // push() hands back the LRU entry when the entry budget is full
        if let Some((_, evicted)) = inner.entries.push(key, image) {
            inner.bytes -= evicted.byte_size();
        }
        inner.bytes += size;
        Ok(())
    }
}
