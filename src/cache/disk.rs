//! Tier 2: on-disk cache of encoded artwork.
//!
//! Each entry is one file named after the SHA-256 of its cache key, sharded
//! into 256 subdirectories (`ab/abcdef...img`). An in-memory LRU index holds
//! size and store time for every file; it is rebuilt from the directory on
//! open, oldest modification time first.
//!
//! Only files with those names are ever indexed or deleted; anything else
//! found under the directory is left alone.
//!
//! Locking: the index mutex is held for bookkeeping and renames only. File
//! contents are read and written outside it, and eviction victims are renamed
//! to `.trash` under the lock and unlinked after it is released.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::{CacheError, TierStats};
use crate::artwork::CacheKey;

const ENTRY_EXTENSION: &str = "img";
const TEMP_EXTENSION: &str = "tmp";
const TRASH_EXTENSION: &str = "trash";

/// Size and age limits for the disk tier.
#[derive(Debug, Clone, Copy)]
pub struct DiskLimits {
    pub max_entries: usize,
    pub max_bytes: u64,
    /// Entries older than this are treated as misses and removed
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    size: u64,
    stored_at: DateTime<Utc>,
}

struct Index {
    entries: LruCache<String, EntryMeta>,
    bytes: u64,
    generation: u64,
}

/// Encoded artwork persisted under a cache directory.
pub struct DiskCache {
    dir: PathBuf,
    limits: DiskLimits,
    index: Mutex<Index>,
    scratch_counter: AtomicU64,
}

impl DiskCache {
    /// Open (or create) a disk cache rooted at `dir`.
    ///
    /// Leftover temp and trash files from an interrupted run are removed and
    /// the index is trimmed to the configured limits.
    pub fn open(dir: impl Into<PathBuf>, limits: DiskLimits) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut found = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(2).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            match classify(&entry) {
                Some(OwnedFile::Entry(name)) => {
                    let Ok(metadata) = entry.metadata() else {
                        continue;
                    };
                    let stored_at = metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now());
                    found.push((
                        name,
                        EntryMeta {
                            size: metadata.len(),
                            stored_at,
                        },
                    ));
                }
                Some(OwnedFile::Scratch) => {
                    let _ = fs::remove_file(entry.path());
                }
                None => {}
            }
        }

        // Oldest first so the LRU order approximates last use
        found.sort_by_key(|(_, meta)| meta.stored_at);

        let mut index = Index {
            entries: LruCache::unbounded(),
            bytes: 0,
            generation: 0,
        };
        for (name, meta) in found {
            index.bytes += meta.size;
            index.entries.put(name, meta);
        }

        let cache = Self {
            dir,
            limits,
            index: Mutex::new(index),
            scratch_counter: AtomicU64::new(0),
        };

        let trash = {
            let mut index = cache.index.lock();
            tracing::debug!(
                dir = %cache.dir.display(),
                entries = index.entries.len(),
                bytes = index.bytes,
                "Opened artwork disk cache"
            );
            cache.evict_locked(&mut index)
        };
        cache.unlink(trash);

        Ok(cache)
    }

    /// Root directory of the cache.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the encoded bytes stored under `key`.
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let name = entry_name(key);

        let expired_trash = {
            let mut index = self.index.lock();
            let Some(meta) = index.entries.get(&name).copied() else {
                return Ok(None);
            };
            if !self.is_expired(&meta) {
                None
            } else {
                self.retire_locked(&mut index, &name)
            }
        };
        if let Some(trash) = expired_trash {
            tracing::debug!(key = %key, "Disk cache entry expired");
            self.unlink(vec![trash]);
            return Ok(None);
        }

        match fs::read(self.entry_path(&name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // File vanished behind our back; forget it
                let mut index = self.index.lock();
                if let Some(meta) = index.entries.pop(&name) {
                    index.bytes -= meta.size;
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check for an unexpired entry without touching its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let index = self.index.lock();
        index
            .entries
            .peek(&entry_name(key))
            .is_some_and(|meta| !self.is_expired(meta))
    }

    /// Store encoded bytes under `key`.
    pub fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let generation = self.generation();
        self.put_since(key, bytes, generation)
    }

    /// Store encoded bytes only if no `clear` happened since `generation` was read.
    ///
    /// The bytes are written to a temp file first and renamed into place under
    /// the index lock once the generation has been re-checked.
    pub fn put_since(&self, key: &CacheKey, bytes: &[u8], generation: u64) -> Result<(), CacheError> {
        let size = bytes.len() as u64;
        if size > self.limits.max_bytes {
            return Err(CacheError::TooLarge {
                size,
                budget: self.limits.max_bytes,
            });
        }

        let name = entry_name(key);
        let final_path = self.entry_path(&name);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.scratch_path(&name, TEMP_EXTENSION);
        fs::write(&temp_path, bytes)?;

        let trash = {
            let mut index = self.index.lock();
            if index.generation != generation {
                drop(index);
                let _ = fs::remove_file(&temp_path);
                return Err(CacheError::StaleGeneration);
            }

            if let Err(e) = fs::rename(&temp_path, &final_path) {
                drop(index);
                let _ = fs::remove_file(&temp_path);
                return Err(e.into());
            }

            if let Some(old) = index.entries.pop(&name) {
                index.bytes -= old.size;
            }
            index.entries.put(
                name,
                EntryMeta {
                    size,
                    stored_at: Utc::now(),
                },
            );
            index.bytes += size;
            self.evict_locked(&mut index)
        };
        self.unlink(trash);
        Ok(())
    }

    /// Remove the entry for `key`, returning whether one existed.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let name = entry_name(key);
        let trash = {
            let mut index = self.index.lock();
            if !index.entries.contains(&name) {
                return false;
            }
            self.retire_locked(&mut index, &name)
        };
        self.unlink(trash.into_iter().collect());
        true
    }

    /// Delete every entry and start a new generation.
    ///
    /// Runs entirely under the index lock so no put can commit halfway
    /// through; puts that started earlier fail their generation check.
    /// Files the cache did not write are kept.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock();
        index.generation += 1;
        index.entries.clear();
        index.bytes = 0;

        let mut first_error = None;
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(2).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file()
                && classify(&entry).is_some()
                && let Err(e) = fs::remove_file(entry.path())
                && e.kind() != io::ErrorKind::NotFound
            {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Current clear generation.
    pub fn generation(&self) -> u64 {
        self.index.lock().generation
    }

    pub fn len(&self) -> usize {
        self.index.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TierStats {
        let index = self.index.lock();
        TierStats {
            entries: index.entries.len(),
            bytes: index.bytes,
            max_entries: self.limits.max_entries,
            max_bytes: self.limits.max_bytes,
        }
    }

    fn is_expired(&self, meta: &EntryMeta) -> bool {
        self.limits
            .max_age
            .is_some_and(|max_age| Utc::now() - meta.stored_at > max_age)
    }

    fn evict_locked(&self, index: &mut Index) -> Vec<PathBuf> {
        let mut trash = Vec::new();
        while index.entries.len() > self.limits.max_entries.max(1) || index.bytes > self.limits.max_bytes {
            let Some((name, meta)) = index.entries.pop_lru() else {
                break;
            };
            index.bytes -= meta.size;
            if let Some(path) = self.move_to_trash(&name) {
                trash.push(path);
            }
        }
        if !trash.is_empty() {
            tracing::debug!(evicted = trash.len(), bytes = index.bytes, "Evicted disk cache entries");
        }
        trash
    }

    fn retire_locked(&self, index: &mut Index, name: &str) -> Option<PathBuf> {
        let meta = index.entries.pop(name)?;
        index.bytes -= meta.size;
        self.move_to_trash(name)
    }

    /// Rename an entry file out of the live namespace so a later put of the
    /// same key cannot be deleted by the deferred unlink.
    fn move_to_trash(&self, name: &str) -> Option<PathBuf> {
        let trash = self.scratch_path(name, TRASH_EXTENSION);
        fs::rename(self.entry_path(name), &trash).ok()?;
        Some(trash)
    }

    fn unlink(&self, paths: Vec<PathBuf>) {
        for path in paths {
            if let Err(e) = fs::remove_file(&path)
                && e.kind() != io::ErrorKind::NotFound
            {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete evicted artwork");
            }
        }
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(&name[..2])
            .join(format!("{}.{}", name, ENTRY_EXTENSION))
    }

    fn scratch_path(&self, name: &str, extension: &str) -> PathBuf {
        let n = self.scratch_counter.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("{}.{}.{}", name, n, extension))
    }

    #[cfg(test)]
    fn backdate(&self, key: &CacheKey, age: Duration) {
        let mut index = self.index.lock();
        if let Some(meta) = index.entries.peek_mut(&entry_name(key)) {
            meta.stored_at = Utc::now() - age;
        }
    }
}

/// Hex SHA-256 of the key string.
fn entry_name(key: &CacheKey) -> String {
    let digest = Sha256::digest(key.to_string().as_bytes());
    format!("{:x}", digest)
}

/// A file the cache wrote itself.
#[derive(Debug, PartialEq, Eq)]
enum OwnedFile {
    /// `ab/<digest>.img`, carrying the digest
    Entry(String),
    /// `<digest>.<n>.tmp` or `<digest>.<n>.trash` at the top level
    Scratch,
}

fn classify(entry: &walkdir::DirEntry) -> Option<OwnedFile> {
    let file_name = entry.file_name().to_str()?;
    let (name, rest) = file_name.split_once('.')?;
    if !is_digest(name) {
        return None;
    }

    match (entry.depth(), rest.split_once('.')) {
        (2, None) if rest == ENTRY_EXTENSION => {
            let shard = entry.path().parent()?.file_name()?.to_str()?;
            (shard == &name[..2]).then(|| OwnedFile::Entry(name.to_string()))
        }
        (1, Some((counter, extension)))
            if (extension == TEMP_EXTENSION || extension == TRASH_EXTENSION)
                && !counter.is_empty()
                && counter.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(OwnedFile::Scratch)
        }
        _ => None,
    }
}

fn is_digest(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
