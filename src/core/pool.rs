use crate::{
    core::bitmap::{Bitmap, PixelFormat},
    utils::error::{format_bytes, PixResult},
};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// Bitmaps larger than this share of the pool budget are never pooled.
const MAX_ENTRY_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimLevel {
    RunningLow,
    Background,
    Moderate,
    Complete,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub evictions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl PoolKey {
    fn of(bitmap: &Bitmap) -> Self {
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
            format: bitmap.format(),
        }
    }
}

#[derive(Default)]
struct PoolState {
    groups: HashMap<PoolKey, Vec<Bitmap>>,
    // One entry per pooled bitmap, oldest first.
    order: VecDeque<PoolKey>,
    size: u64,
    stats: PoolStats,
}

impl PoolState {
    fn contains(&self, bitmap: &Bitmap) -> bool {
        self.groups
            .get(&PoolKey::of(bitmap))
            .is_some_and(|group| group.iter().any(|pooled| Bitmap::same(pooled, bitmap)))
    }

    fn take(&mut self, key: PoolKey) -> Option<Bitmap> {
        let group = self.groups.get_mut(&key)?;
        let bitmap = group.pop()?;
        if group.is_empty() {
            self.groups.remove(&key);
        }
        if let Some(index) = self.order.iter().rposition(|k| *k == key) {
            self.order.remove(index);
        }
        self.size = self.size.saturating_sub(bitmap.byte_count());
        Some(bitmap)
    }

    fn trim_to(&mut self, target: u64, caller: &str) {
        while self.size > target {
            let Some(key) = self.order.pop_front() else {
                self.size = 0;
                break;
            };
            let Some(group) = self.groups.get_mut(&key) else {
                continue;
            };
            let removed = group.remove(0);
            if group.is_empty() {
                self.groups.remove(&key);
            }
            self.size = self.size.saturating_sub(removed.byte_count());
            removed.recycle();
            self.stats.evictions += 1;
            debug!("trimToSize. Recycle bitmap. {}. {}", caller, removed);
        }
    }
}

pub struct BitmapPool {
    max_size: u64,
    state: Mutex<PoolState>,
}

impl BitmapPool {
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }

    /// Returns a bitmap to the pool. Bitmaps the pool cannot keep are
    /// recycled; already-recycled or already-pooled bitmaps are left alone.
    pub fn free(&self, bitmap: Bitmap) -> bool {
        if bitmap.is_recycled() {
            warn!("free reject. Recycled. {}", bitmap);
            return false;
        }

        let mut state = self.state.lock();
        if state.contains(&bitmap) {
            warn!("free reject. Already pooled. {}", bitmap);
            return false;
        }

        if let Some(reason) = self.reject_reason(&bitmap) {
            drop(state);
            bitmap.recycle();
            warn!("free failed, recycle. {}. {}", reason, bitmap);
            return false;
        }

        let bytes = bitmap.byte_count();
        state.trim_to(self.max_size.saturating_sub(bytes), "putBefore");
        let key = PoolKey::of(&bitmap);
        state.groups.entry(key).or_default().push(bitmap.clone());
        state.order.push_back(key);
        state.size += bytes;
        state.stats.puts += 1;
        debug!(
            "free success. bitmap size {}, pool size {}. {}",
            format_bytes(bytes),
            format_bytes(state.size),
            bitmap
        );
        true
    }

    fn reject_reason(&self, bitmap: &Bitmap) -> Option<String> {
        if !bitmap.is_mutable() {
            return Some("Immutable".to_string());
        }
        let bytes = bitmap.byte_count();
        if bytes as f64 > self.max_size as f64 * MAX_ENTRY_RATIO {
            return Some(format!(
                "Too big {}, maxSize {}",
                format_bytes(bytes),
                format_bytes(self.max_size)
            ));
        }
        None
    }

    pub fn obtain_dirty(&self, width: u32, height: u32, format: PixelFormat) -> Option<Bitmap> {
        let mut state = self.state.lock();
        let bitmap = state.take(PoolKey {
            width,
            height,
            format,
        });
        match &bitmap {
            Some(bitmap) => {
                state.stats.hits += 1;
                debug!("obtain. Hit. {}. {}", bitmap, format_bytes(state.size));
            }
            None => {
                state.stats.misses += 1;
                debug!(
                    "obtain. NoHit. {}x{},{}. {}",
                    width,
                    height,
                    format,
                    format_bytes(state.size)
                );
            }
        }
        bitmap
    }

    pub fn obtain(&self, width: u32, height: u32, format: PixelFormat) -> Option<Bitmap> {
        let bitmap = self.obtain_dirty(width, height, format)?;
        bitmap.erase();
        Some(bitmap)
    }

    pub fn obtain_or_create(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> PixResult<Bitmap> {
        if let Some(bitmap) = self.obtain(width, height, format) {
            return Ok(bitmap);
        }
        let bitmap = Bitmap::new(width, height, format)?;
        debug!("Create bitmap. {}", bitmap);
        Ok(bitmap)
    }

    pub fn trim(&self, level: TrimLevel) {
        let mut state = self.state.lock();
        let old_size = state.size;
        match level {
            TrimLevel::Moderate | TrimLevel::Complete => state.trim_to(0, "trim"),
            TrimLevel::Background => state.trim_to(self.max_size / 2, "trim"),
            TrimLevel::RunningLow => {}
        }
        warn!(
            "trim. level '{:?}', released {}, size {}",
            level,
            format_bytes(old_size - state.size),
            format_bytes(state.size)
        );
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        let old_size = state.size;
        state.trim_to(0, "clear");
        warn!("clear. cleared {}", format_bytes(old_size));
    }
}
