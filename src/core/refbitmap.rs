use crate::{
    core::{bitmap::Bitmap, cache::CacheKey, pool::BitmapPool},
    image::loader::ImageInfo,
};
use log::debug;
use parking_lot::Mutex;
use std::{fmt, ops::Deref, sync::Arc};

#[derive(Default)]
struct Counts {
    cache_refs: u32,
    handles: u32,
    released: bool,
}

pub struct RefBitmap {
    bitmap: Bitmap,
    key: Option<CacheKey>,
    uri: String,
    info: ImageInfo,
    pool: Arc<BitmapPool>,
    counts: Mutex<Counts>,
}

impl RefBitmap {
    pub fn new(
        bitmap: Bitmap,
        key: Option<CacheKey>,
        uri: impl Into<String>,
        info: ImageInfo,
        pool: Arc<BitmapPool>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bitmap,
            key,
            uri: uri.into(),
            info,
            pool,
            counts: Mutex::new(Counts::default()),
        })
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn byte_count(&self) -> u64 {
        self.bitmap.byte_count()
    }

    pub fn is_recycled(&self) -> bool {
        self.counts.lock().released || self.bitmap.is_recycled()
    }

    pub fn is_cached(&self) -> bool {
        self.counts.lock().cache_refs > 0
    }

    pub fn handle_count(&self) -> u32 {
        self.counts.lock().handles
    }

    /// Registers a new displayer. Returns `None` once the pixels have been
    /// released or recycled, so a stale cache entry can never be displayed.
    pub fn try_attach(self: &Arc<Self>) -> Option<RefHandle> {
        let mut counts = self.counts.lock();
        if counts.released || self.bitmap.is_recycled() {
            return None;
        }
        counts.handles += 1;
        Some(RefHandle {
            inner: Arc::clone(self),
        })
    }

    pub(crate) fn retain_cache_ref(&self) {
        self.counts.lock().cache_refs += 1;
    }

    pub(crate) fn release_cache_ref(&self) {
        let mut counts = self.counts.lock();
        counts.cache_refs = counts.cache_refs.saturating_sub(1);
        self.release_if_unused(&mut counts, "uncache");
    }

    fn detach(&self) {
        let mut counts = self.counts.lock();
        counts.handles = counts.handles.saturating_sub(1);
        self.release_if_unused(&mut counts, "detach");
    }

    fn release_if_unused(&self, counts: &mut Counts, caller: &str) {
        if counts.cache_refs > 0 || counts.handles > 0 || counts.released {
            return;
        }
        counts.released = true;
        if self.bitmap.is_recycled() {
            debug!("{}. Bitmap already recycled. {}", caller, self);
        } else {
            debug!("{}. Free bitmap. {}", caller, self);
            self.pool.free(self.bitmap.clone());
        }
    }
}

impl fmt::Display for RefBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefBitmap({}, {}, {})", self.uri, self.info, self.bitmap)
    }
}

impl fmt::Debug for RefBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts.lock();
        f.debug_struct("RefBitmap")
            .field("uri", &self.uri)
            .field("key", &self.key)
            .field("bitmap", &self.bitmap)
            .field("cache_refs", &counts.cache_refs)
            .field("handles", &counts.handles)
            .field("released", &counts.released)
            .finish()
    }
}

pub struct RefHandle {
    inner: Arc<RefBitmap>,
}

impl RefHandle {
    pub fn ref_bitmap(&self) -> &Arc<RefBitmap> {
        &self.inner
    }
}

impl Clone for RefHandle {
    fn clone(&self) -> Self {
        self.inner.counts.lock().handles += 1;
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for RefHandle {
    fn drop(&mut self) {
        self.inner.detach();
    }
}

impl Deref for RefHandle {
    type Target = RefBitmap;

    fn deref(&self) -> &RefBitmap {
        &self.inner
    }
}

impl fmt::Debug for RefHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefHandle").field(&self.inner).finish()
    }
}
