//! The combined cache store used by the resolver.

use std::path::PathBuf;

use super::{CacheError, DiskCache, DiskLimits, MemoryCache, TierStats};
use crate::artwork::{CacheKey, CachedImage};
use crate::config::CacheConfig;

/// Generations of both tiers, captured together when a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeneration {
    pub memory: u64,
    pub disk: u64,
}

/// Occupancy of both tiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub memory: TierStats,
    pub disk: TierStats,
}

/// Memory tier in front of the disk tier.
pub struct CacheStore {
    memory: MemoryCache,
    disk: DiskCache,
}

impl CacheStore {
    pub fn new(memory: MemoryCache, disk: DiskCache) -> Self {
        Self { memory, disk }
    }

    /// Build both tiers from configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        let memory = MemoryCache::new(config.memory_max_entries, config.memory_max_bytes);
        let disk = DiskCache::open(config.directory(), config.disk_limits())?;
        Ok(Self::new(memory, disk))
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }

    pub fn disk_dir(&self) -> PathBuf {
        self.disk.dir().to_path_buf()
    }

    /// Snapshot both generations.
    pub fn generation(&self) -> CacheGeneration {
        CacheGeneration {
            memory: self.memory.generation(),
            disk: self.disk.generation(),
        }
    }

    /// Write an image to both tiers, disk first, unless either tier was
    /// cleared after `generation` was captured.
    ///
    /// A disk failure other than a stale generation is logged and the memory
    /// tier is still populated.
    pub fn store(&self, key: &CacheKey, image: &CachedImage, generation: CacheGeneration) -> Result<(), CacheError> {
        match self.disk.put_since(key, image.encoded(), generation.disk) {
            Ok(()) => {}
            Err(CacheError::StaleGeneration) => return Err(CacheError::StaleGeneration),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to write artwork to disk cache"),
        }
        self.memory.put_since(key.clone(), image.clone(), generation.memory)
    }

    /// Clear both tiers. Returns `false` if the disk tier could not be fully emptied.
    pub fn clear_all(&self) -> bool {
        self.memory.clear();
        match self.disk.clear() {
            Ok(()) => {
                tracing::info!("Cleared artwork caches");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear artwork disk cache");
                false
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory: self.memory.stats(),
            disk: self.disk.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artwork::{ArtworkIdentity, ArtworkKind, derive_key};
    use crate::test_utils::{png_image, temp_store};

    fn key() -> CacheKey {
        derive_key(&ArtworkIdentity::album("Massive Attack", "Mezzanine"), ArtworkKind::Thumbnail).unwrap()
    }

    #[test]
    fn test_store_writes_both_tiers() {
        let (store, _dir) = temp_store();
        let image = png_image(3, 3);

        store.store(&key(), &image, store.generation()).unwrap();

        assert!(store.memory().get(&key()).is_some());
        assert_eq!(store.disk().get(&key()).unwrap().as_deref(), Some(image.encoded()));
    }

    #[test]
    fn test_clear_all_refuses_older_writes() {
        let (store, _dir) = temp_store();
        let generation = store.generation();

        assert!(store.clear_all());

        let result = store.store(&key(), &png_image(1, 1), generation);
        assert!(matches!(result, Err(CacheError::StaleGeneration)));
        assert!(store.memory().get(&key()).is_none());
        assert!(store.disk().get(&key()).unwrap().is_none());
    }

    #[test]
    fn test_clear_all_racing_put_never_leaves_stale_entry() {
        let (store, _dir) = temp_store();
        let store = std::sync::Arc::new(store);

        for _ in 0..20 {
            let generation = store.generation();
            let writer = {
                let store = store.clone();
                std::thread::spawn(move || {
                    let _ = store.store(&key(), &png_image(2, 2), generation);
                })
            };
            let cleared = store.clear_all();
            writer.join().unwrap();
            assert!(cleared);

            // Whatever order the threads ran in, the pre-clear write is gone
            assert!(store.memory().get(&key()).is_none());
            assert!(store.disk().get(&key()).unwrap().is_none());
        }
    }

    #[test]
    fn test_stats_report_both_tiers() {
        let (store, _dir) = temp_store();
        store.store(&key(), &png_image(2, 2), store.generation()).unwrap();

        let stats = store.stats();
        assert_eq!(stats.memory.entries, 1);
        assert_eq!(stats.disk.entries, 1);
        assert!(stats.disk.bytes > 0);
    }
}
