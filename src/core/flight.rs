use crate::core::cache::CacheKey;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run<T>(&self, key: &CacheKey, f: impl FnOnce() -> T) -> T {
        // Declared first so it drops last, after the guard and our clone.
        let _release = Release {
            locks: &self.locks,
            key,
        };
        let mutex = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let _guard = mutex.lock();
        f()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

struct Release<'a> {
    locks: &'a DashMap<CacheKey, Arc<Mutex<()>>>,
    key: &'a CacheKey,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
