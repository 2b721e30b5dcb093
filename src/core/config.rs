use crate::{
    core::{cache::MemoryCache, context::Context, flight::KeyLocks, pool::BitmapPool},
    image::transform::{ImageProcessor, ResizeProcessor},
    uri::model::UriRegistry,
    utils::error::{MemoryStats, PixError},
};
use log::error;
use std::sync::Arc;

pub const DEFAULT_MEMORY_CACHE_SIZE: u64 = 64 * 1024 * 1024;
pub const DEFAULT_BITMAP_POOL_SIZE: u64 = 32 * 1024 * 1024;

pub trait ErrorCallback: Send + Sync {
    fn on_error(&self, error: &PixError);
}

pub struct LogErrorCallback;

impl ErrorCallback for LogErrorCallback {
    fn on_error(&self, error: &PixError) {
        error!("{}", error);
    }
}

pub struct Configuration {
    context: Context,
    memory_cache: Arc<MemoryCache>,
    bitmap_pool: Arc<BitmapPool>,
    uri_registry: UriRegistry,
    resize_processor: Arc<dyn ImageProcessor>,
    callback: Arc<dyn ErrorCallback>,
    low_quality_image: bool,
    key_locks: KeyLocks,
}

impl Configuration {
    pub fn builder(context: Context) -> ConfigurationBuilder {
        ConfigurationBuilder::new(context)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn memory_cache(&self) -> &Arc<MemoryCache> {
        &self.memory_cache
    }

    pub fn bitmap_pool(&self) -> &Arc<BitmapPool> {
        &self.bitmap_pool
    }

    pub fn uri_registry(&self) -> &UriRegistry {
        &self.uri_registry
    }

    pub fn resize_processor(&self) -> &Arc<dyn ImageProcessor> {
        &self.resize_processor
    }

    pub fn callback(&self) -> &Arc<dyn ErrorCallback> {
        &self.callback
    }

    pub fn is_low_quality_image(&self) -> bool {
        self.low_quality_image
    }

    pub fn key_locks(&self) -> &KeyLocks {
        &self.key_locks
    }

    pub fn memory_stats(&self) -> MemoryStats {
        MemoryStats {
            cache_size: self.memory_cache.size(),
            cache_max: self.memory_cache.max_size(),
            pool_size: self.bitmap_pool.size(),
            pool_max: self.bitmap_pool.max_size(),
        }
    }
}

pub struct ConfigurationBuilder {
    context: Context,
    memory_cache_size: u64,
    bitmap_pool_size: u64,
    memory_cache: Option<Arc<MemoryCache>>,
    bitmap_pool: Option<Arc<BitmapPool>>,
    uri_registry: Option<UriRegistry>,
    resize_processor: Option<Arc<dyn ImageProcessor>>,
    callback: Option<Arc<dyn ErrorCallback>>,
    low_quality_image: bool,
}

impl ConfigurationBuilder {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            memory_cache_size: DEFAULT_MEMORY_CACHE_SIZE,
            bitmap_pool_size: DEFAULT_BITMAP_POOL_SIZE,
            memory_cache: None,
            bitmap_pool: None,
            uri_registry: None,
            resize_processor: None,
            callback: None,
            low_quality_image: false,
        }
    }

    pub fn memory_cache_size(mut self, bytes: u64) -> Self {
        self.memory_cache_size = bytes;
        self
    }

    pub fn bitmap_pool_size(mut self, bytes: u64) -> Self {
        self.bitmap_pool_size = bytes;
        self
    }

    pub fn memory_cache(mut self, cache: Arc<MemoryCache>) -> Self {
        self.memory_cache = Some(cache);
        self
    }

    pub fn bitmap_pool(mut self, pool: Arc<BitmapPool>) -> Self {
        self.bitmap_pool = Some(pool);
        self
    }

    pub fn uri_registry(mut self, registry: UriRegistry) -> Self {
        self.uri_registry = Some(registry);
        self
    }

    pub fn resize_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.resize_processor = Some(processor);
        self
    }

    pub fn callback(mut self, callback: Arc<dyn ErrorCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn low_quality_image(mut self, low_quality: bool) -> Self {
        self.low_quality_image = low_quality;
        self
    }

    pub fn build(self) -> Configuration {
        Configuration {
            context: self.context,
            memory_cache: self
                .memory_cache
                .unwrap_or_else(|| Arc::new(MemoryCache::new(self.memory_cache_size))),
            bitmap_pool: self
                .bitmap_pool
                .unwrap_or_else(|| Arc::new(BitmapPool::new(self.bitmap_pool_size))),
            uri_registry: self.uri_registry.unwrap_or_default(),
            resize_processor: self
                .resize_processor
                .unwrap_or_else(|| Arc::new(ResizeProcessor)),
            callback: self
                .callback
                .unwrap_or_else(|| Arc::new(LogErrorCallback)),
            low_quality_image: self.low_quality_image,
            key_locks: KeyLocks::new(),
        }
    }
}
