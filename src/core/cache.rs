use crate::{
    core::{pool::TrimLevel, refbitmap::RefBitmap},
    utils::error::format_bytes,
};
use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, Eq, Hash, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(uri: &str, convert_short_uri: bool, options_key: &str) -> Self {
        let mut key = if convert_short_uri {
            format!("{:x}", Sha256::digest(uri.as_bytes()))
        } else {
            uri.to_string()
        };
        key.push_str(options_key);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheState {
    entries: LruCache<CacheKey, Arc<RefBitmap>>,
    size: u64,
}

pub struct MemoryCache {
    max_size: u64,
    state: Mutex<CacheState>,
}

impl MemoryCache {
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                size: 0,
            }),
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains(key)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RefBitmap>> {
        self.state.lock().entries.get(key).cloned()
    }

    pub fn put(&self, key: CacheKey, value: Arc<RefBitmap>) -> bool {
        let bytes = value.byte_count();
        if bytes > self.max_size {
            warn!(
                "put reject. Too big {}, maxSize {}. {}",
                format_bytes(bytes),
                format_bytes(self.max_size),
                key
            );
            return false;
        }

        value.retain_cache_ref();
        let mut released = Vec::new();
        {
            let mut state = self.state.lock();
            if let Some(old) = state.entries.put(key.clone(), value) {
                state.size = state.size.saturating_sub(old.byte_count());
                released.push(old);
            }
            state.size += bytes;
            while state.size > self.max_size {
                let Some((evicted_key, evicted)) = state.entries.pop_lru() else {
                    break;
                };
                state.size = state.size.saturating_sub(evicted.byte_count());
                debug!("evict. {}. {}", evicted_key, evicted);
                released.push(evicted);
            }
            debug!("put. {}. size {}", key, format_bytes(state.size));
        }
        for old in released {
            old.release_cache_ref();
        }
        true
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<RefBitmap>> {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.entries.pop(key)?;
            state.size = state.size.saturating_sub(removed.byte_count());
            removed
        };
        debug!("remove. {}. {}", key, removed);
        removed.release_cache_ref();
        Some(removed)
    }

    pub fn trim(&self, level: TrimLevel) {
        let target = match level {
            TrimLevel::Moderate | TrimLevel::Complete => 0,
            TrimLevel::RunningLow | TrimLevel::Background => self.max_size / 2,
        };
        let old_size = self.size();
        self.trim_to(target);
        warn!(
            "trim. level '{:?}', released {}, size {}",
            level,
            format_bytes(old_size.saturating_sub(self.size())),
            format_bytes(self.size())
        );
    }

    pub fn clear(&self) {
        self.trim_to(0);
    }

    fn trim_to(&self, target: u64) {
        let mut released = Vec::new();
        {
            let mut state = self.state.lock();
            while state.size > target {
                let Some((_, evicted)) = state.entries.pop_lru() else {
                    state.size = 0;
                    break;
                };
                state.size = state.size.saturating_sub(evicted.byte_count());
                released.push(evicted);
            }
        }
        for evicted in released {
            evicted.release_cache_ref();
        }
    }
}
