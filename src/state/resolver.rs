use crate::{
    core::{
        bitmap::Bitmap,
        cache::{CacheKey, MemoryCache},
        config::Configuration,
        context::ResId,
        pool::BitmapPool,
        refbitmap::RefBitmap,
    },
    image::{loader::ImageInfo, transform::ImageProcessor},
    state::{
        drawable::{drawable_to_bitmap, Drawable, ImageFrom, RefBitmapDrawable},
        options::DisplayOptions,
    },
    uri::schemes::DrawableUriModel,
    utils::error::{PixError, PixResult, ProcessImageError},
};
use log::{debug, error, warn};
use std::sync::Arc;

// Borrowed pixels belong to the resources and never reach the pool.
enum Pixels {
    Owned(Bitmap),
    Borrowed(Bitmap),
}

impl Pixels {
    fn bitmap(&self) -> &Bitmap {
        match self {
            Pixels::Owned(bitmap) | Pixels::Borrowed(bitmap) => bitmap,
        }
    }

    fn release(self, pool: &BitmapPool) {
        if let Pixels::Owned(bitmap) = self {
            pool.free(bitmap);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakerStateImage {
    res_id: ResId,
}

impl MakerStateImage {
    pub fn new(res_id: ResId) -> Self {
        Self { res_id }
    }

    pub fn res_id(&self) -> ResId {
        self.res_id
    }

    pub fn uri(&self) -> String {
        DrawableUriModel::make_uri(self.res_id)
    }

    pub fn drawable(&self, config: &Configuration, options: &DisplayOptions) -> PixResult<Drawable> {
        let drawable = self.make_drawable(config, options)?;
        Ok(drawable.shaped(options.shape_size, options.shaper.clone()))
    }

    fn make_drawable(&self, config: &Configuration, options: &DisplayOptions) -> PixResult<Drawable> {
        if !options.needs_processing() {
            return config
                .context()
                .resources()
                .drawable(self.res_id)
                .ok_or_else(|| PixError::DecodeFailed(self.uri()));
        }

        let uri = self.uri();
        let key = config
            .uri_registry()
            .match_uri(&uri)
            .map(|model| model.cache_key(&uri, &options.state_image_key()));

        match key {
            Some(key) => config
                .key_locks()
                .run(&key, || self.load(config, options, &uri, Some(&key))),
            None => {
                debug!("No uri model for {}, result is not cached", uri);
                self.load(config, options, &uri, None)
            }
        }
    }

    fn load(
        &self,
        config: &Configuration,
        options: &DisplayOptions,
        uri: &str,
        key: Option<&CacheKey>,
    ) -> PixResult<Drawable> {
        let cache = config.memory_cache();
        if let Some(drawable) = key.and_then(|key| Self::lookup(cache, key)) {
            return Ok(drawable);
        }

        let low_quality = config.is_low_quality_image() || options.low_quality_image;
        let (drawable, pixels) = self.decode(config, uri, low_quality)?;

        let processor = options
            .processor
            .clone()
            .unwrap_or_else(|| Arc::clone(config.resize_processor()));
        let pixels = Self::process(config, processor.as_ref(), options, pixels, uri, low_quality)?;

        let bitmap = match pixels {
            Pixels::Owned(bitmap) => bitmap,
            Pixels::Borrowed(_) => return Ok(drawable),
        };

        let info = config
            .context()
            .resources()
            .bounds(self.res_id)
            .unwrap_or_else(|| ImageInfo::new("", bitmap.width(), bitmap.height()));
        let ref_bitmap = RefBitmap::new(
            bitmap,
            key.cloned(),
            uri,
            info,
            Arc::clone(config.bitmap_pool()),
        );
        let handle = ref_bitmap
            .try_attach()
            .ok_or_else(|| PixError::DecodeFailed(uri.to_string()))?;
        if let Some(key) = key {
            cache.put(key.clone(), Arc::clone(&ref_bitmap));
        }
        Ok(Drawable::Ref(RefBitmapDrawable::new(handle, ImageFrom::Local)))
    }

    fn lookup(cache: &MemoryCache, key: &CacheKey) -> Option<Drawable> {
        let cached = cache.get(key)?;
        match cached.try_attach() {
            Some(handle) => Some(Drawable::Ref(RefBitmapDrawable::new(
                handle,
                ImageFrom::MemoryCache,
            ))),
            None => {
                debug!("Cached bitmap recycled, removing. {}", key);
                cache.remove(key);
                None
            }
        }
    }

    fn decode(
        &self,
        config: &Configuration,
        uri: &str,
        low_quality: bool,
    ) -> PixResult<(Drawable, Pixels)> {
        let decode_failed = || PixError::DecodeFailed(uri.to_string());
        let drawable = config
            .context()
            .resources()
            .drawable(self.res_id)
            .ok_or_else(decode_failed)?;

        let pixels = match &drawable {
            Drawable::Bitmap(bitmap_drawable) => Pixels::Borrowed(bitmap_drawable.bitmap().clone()),
            other => match drawable_to_bitmap(other, low_quality, config.bitmap_pool()) {
                Ok(Some(bitmap)) => Pixels::Owned(bitmap),
                Ok(None) => return Err(decode_failed()),
                Err(err) => {
                    warn!("Failed to rasterise {}: {}", uri, err);
                    return Err(decode_failed());
                }
            },
        };

        if pixels.bitmap().is_recycled() {
            return Err(decode_failed());
        }
        Ok((drawable, pixels))
    }

    fn process(
        config: &Configuration,
        processor: &dyn ImageProcessor,
        options: &DisplayOptions,
        pixels: Pixels,
        uri: &str,
        low_quality: bool,
    ) -> PixResult<Pixels> {
        let pool = config.bitmap_pool();
        let result = processor.process(pool, pixels.bitmap(), options.resize.as_ref(), low_quality);
        let new_bitmap = match result {
            Ok(bitmap) => bitmap,
            Err(err) if err.is_out_of_memory() => {
                let stats = config.memory_stats();
                error!(
                    "onProcessImageError. imageUri: {}. processor: {}. {}",
                    uri,
                    processor.key(),
                    stats
                );
                let error = PixError::ProcessImage(Box::new(ProcessImageError {
                    uri: uri.to_string(),
                    processor: processor.key(),
                    stats,
                    cause: Box::new(err),
                }));
                config.callback().on_error(&error);
                pixels.release(pool);
                return Err(error);
            }
            Err(err) => {
                warn!(
                    "Process failed. imageUri: {}. processor: {}. {}",
                    uri,
                    processor.key(),
                    err
                );
                pixels.release(pool);
                return Err(err);
            }
        };

        if Bitmap::same(&new_bitmap, pixels.bitmap()) {
            return Ok(pixels);
        }

        pixels.release(pool);
        if new_bitmap.is_recycled() {
            return Err(PixError::DecodeFailed(uri.to_string()));
        }
        Ok(Pixels::Owned(new_bitmap))
    }
}
