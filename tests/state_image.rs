use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use pixcache::{
    core::{
        bitmap::{Bitmap, PixelFormat},
        pool::BitmapPool,
    },
    image::{
        loader::MemoryResources,
        shaper::{CircleShaper, ShapeSize},
        transform::{ImageProcessor, Resize, ResizeProcessor},
    },
    state::{
        drawable::{ColorDrawable, Drawable, ImageFrom},
        options::DisplayOptions,
    },
    uri::{model::UriRegistry, schemes::FileUriModel},
    Configuration, Context, ErrorCallback, PixError, PixResult, Pixcache,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

const PHOTO: u32 = 1;
const SWATCH: u32 = 2;

fn resources() -> Arc<MemoryResources> {
    let resources = Arc::new(MemoryResources::new());
    resources
        .insert_image(PHOTO, RgbaImage::from_pixel(200, 200, Rgba([30, 60, 90, 255])))
        .unwrap();
    resources.insert_color(SWATCH, ColorDrawable::new([255, 0, 0, 255], Some((10, 10))));
    resources
}

fn sketch(resources: &Arc<MemoryResources>) -> Pixcache {
    Pixcache::new(Configuration::builder(Context::new(resources.clone())).build())
}

fn resize_100() -> DisplayOptions {
    DisplayOptions::new().resize(Resize::new(100, 100))
}

#[derive(Default)]
struct CountingProcessor {
    calls: AtomicUsize,
    delay: Duration,
}

impl ImageProcessor for CountingProcessor {
    fn key(&self) -> String {
        "CountingProcessor".to_string()
    }

    fn process(
        &self,
        pool: &BitmapPool,
        bitmap: &Bitmap,
        resize: Option<&Resize>,
        low_quality: bool,
    ) -> PixResult<Bitmap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        ResizeProcessor.process(pool, bitmap, resize, low_quality)
    }
}

struct OomProcessor;

impl ImageProcessor for OomProcessor {
    fn key(&self) -> String {
        "OomProcessor".to_string()
    }

    fn process(
        &self,
        _pool: &BitmapPool,
        _bitmap: &Bitmap,
        _resize: Option<&Resize>,
        _low_quality: bool,
    ) -> PixResult<Bitmap> {
        Err(PixError::OutOfMemory { bytes: u64::MAX })
    }
}

struct RecycledProcessor;

impl ImageProcessor for RecycledProcessor {
    fn key(&self) -> String {
        "RecycledProcessor".to_string()
    }

    fn process(
        &self,
        _pool: &BitmapPool,
        _bitmap: &Bitmap,
        _resize: Option<&Resize>,
        _low_quality: bool,
    ) -> PixResult<Bitmap> {
        let bitmap = Bitmap::new(4, 4, PixelFormat::Rgba8888)?;
        bitmap.recycle();
        Ok(bitmap)
    }
}

#[derive(Default)]
struct RecordingCallback {
    errors: Mutex<Vec<(String, String)>>,
}

impl ErrorCallback for RecordingCallback {
    fn on_error(&self, error: &PixError) {
        if let PixError::ProcessImage(err) = error {
            self.errors
                .lock()
                .push((err.uri.clone(), err.processor.clone()));
        }
    }
}

#[test]
fn test_no_transform_returns_resource_drawable() {
    let resources = resources();
    let sketch = sketch(&resources);

    let drawable = sketch.state_image(PHOTO, &DisplayOptions::new()).unwrap();

    let Drawable::Bitmap(bitmap_drawable) = &drawable else {
        panic!("expected the resource bitmap, got {:?}", drawable);
    };
    let original = resources.bitmap(PHOTO).unwrap();
    assert!(Bitmap::same(bitmap_drawable.bitmap(), &original));
    assert!(sketch.configuration().memory_cache().is_empty());
}

#[test]
fn test_resize_caches_and_reuses() {
    let resources = resources();
    let processor = Arc::new(CountingProcessor::default());
    let sketch = sketch(&resources);
    let options = resize_100().processor(processor.clone());

    let first = sketch.state_image(PHOTO, &options).unwrap();
    assert_eq!(first.image_from(), Some(ImageFrom::Local));
    assert_eq!(first.intrinsic_size(), Some((100, 100)));
    assert_eq!(sketch.configuration().memory_cache().len(), 1);

    let second = sketch.state_image(PHOTO, &options).unwrap();
    assert_eq!(second.image_from(), Some(ImageFrom::MemoryCache));
    assert!(Bitmap::same(
        first.bitmap().unwrap(),
        second.bitmap().unwrap()
    ));
    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_default_resize_processor_is_used() {
    let resources = resources();
    let sketch = sketch(&resources);

    let drawable = sketch.state_image(PHOTO, &resize_100()).unwrap();
    assert_eq!(drawable.image_from(), Some(ImageFrom::Local));
    let pixel = drawable.to_rgba().unwrap().get_pixel(50, 50).0;
    for (actual, expected) in pixel.iter().zip([30u8, 60, 90, 255]) {
        assert!(actual.abs_diff(expected) <= 2, "{:?}", pixel);
    }
}

#[test]
fn test_different_options_cache_separately() {
    let resources = resources();
    let sketch = sketch(&resources);

    sketch.state_image(PHOTO, &resize_100()).unwrap();
    sketch
        .state_image(PHOTO, &DisplayOptions::new().resize(Resize::new(50, 50)))
        .unwrap();
    assert_eq!(sketch.configuration().memory_cache().len(), 2);
}

#[test]
fn test_recycled_cache_entry_is_replaced() {
    let resources = resources();
    let processor = Arc::new(CountingProcessor::default());
    let sketch = sketch(&resources);
    let options = resize_100().processor(processor.clone());

    let first = sketch.state_image(PHOTO, &options).unwrap();
    let stale = first.bitmap().unwrap().clone();
    drop(first);
    stale.recycle();

    let second = sketch.state_image(PHOTO, &options).unwrap();
    assert_eq!(second.image_from(), Some(ImageFrom::Local));
    assert!(!second.bitmap().unwrap().is_recycled());
    assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sketch.configuration().memory_cache().len(), 1);
}

#[test]
fn test_out_of_memory_reports_once_and_frees_original() {
    let resources = resources();
    let callback = Arc::new(RecordingCallback::default());
    let sketch = Pixcache::new(
        Configuration::builder(Context::new(resources.clone()))
            .callback(callback.clone())
            .build(),
    );
    let options = resize_100().processor(Arc::new(OomProcessor));

    let err = sketch.state_image(SWATCH, &options).unwrap_err();

    let PixError::ProcessImage(details) = &err else {
        panic!("expected a process image error, got {:?}", err);
    };
    assert_eq!(details.uri, format!("drawable://{}", SWATCH));
    assert_eq!(details.processor, "OomProcessor");
    assert!(err.is_out_of_memory());
    assert_eq!(
        *callback.errors.lock(),
        vec![(format!("drawable://{}", SWATCH), "OomProcessor".to_string())]
    );
    assert_eq!(sketch.configuration().bitmap_pool().stats().puts, 1);
    assert!(sketch.configuration().memory_cache().is_empty());
}

#[test]
fn test_out_of_memory_never_pools_resource_bitmap() {
    let resources = resources();
    let sketch = sketch(&resources);
    let options = resize_100().processor(Arc::new(OomProcessor));

    assert!(sketch.state_image(PHOTO, &options).is_err());
    assert_eq!(sketch.configuration().bitmap_pool().stats().puts, 0);
    assert!(!resources.bitmap(PHOTO).unwrap().is_recycled());
}

#[test]
fn test_resource_bitmap_is_not_pooled_after_resize() {
    let resources = resources();
    let sketch = sketch(&resources);

    let drawable = sketch.state_image(PHOTO, &resize_100()).unwrap();
    drop(drawable);
    sketch.configuration().memory_cache().clear();

    let pool = sketch.configuration().bitmap_pool();
    assert_eq!(pool.stats().puts, 1);
    assert!(pool.obtain(100, 100, PixelFormat::Rgba8888).is_some());
    assert!(pool.obtain(200, 200, PixelFormat::Rgba8888).is_none());
    assert!(!resources.bitmap(PHOTO).unwrap().is_recycled());
}

#[test]
fn test_unchanged_resource_bitmap_is_returned_raw() {
    let resources = resources();
    let sketch = sketch(&resources);

    let drawable = sketch
        .state_image(PHOTO, &DisplayOptions::new().resize(Resize::new(200, 200)))
        .unwrap();

    let Drawable::Bitmap(bitmap_drawable) = &drawable else {
        panic!("expected the resource bitmap, got {:?}", drawable);
    };
    assert!(Bitmap::same(
        bitmap_drawable.bitmap(),
        &resources.bitmap(PHOTO).unwrap()
    ));
    assert_eq!(drawable.image_from(), None);
    assert!(sketch.configuration().memory_cache().is_empty());
    drop(drawable);
    assert_eq!(sketch.configuration().bitmap_pool().stats().puts, 0);
    assert!(!resources.bitmap(PHOTO).unwrap().is_recycled());
}

#[test]
fn test_oversized_color_resource_fails_without_panic() {
    let resources = resources();
    resources.insert_color(
        3,
        ColorDrawable::new([255, 0, 0, 255], Some((u32::MAX, u32::MAX))),
    );
    let sketch = sketch(&resources);
    let options = DisplayOptions::new().resize(Resize::new(10, 10));

    let err = sketch.state_image(3, &options).unwrap_err();
    assert!(matches!(err, PixError::DecodeFailed(_)));
    assert!(sketch.configuration().memory_cache().is_empty());
    assert!(sketch.configuration().key_locks().is_empty());

    let drawable = sketch.state_image(SWATCH, &options).unwrap();
    assert_eq!(drawable.intrinsic_size(), Some((10, 10)));
}

#[test]
fn test_color_resource_is_rasterised_and_cached() {
    let resources = resources();
    let sketch = sketch(&resources);
    let options = DisplayOptions::new().resize(Resize::new(10, 10));

    let drawable = sketch.state_image(SWATCH, &options).unwrap();
    assert!(drawable.is_bitmap_backed());
    assert_eq!(drawable.image_from(), Some(ImageFrom::Local));
    assert_eq!(drawable.to_rgba().unwrap().get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(sketch.configuration().memory_cache().len(), 1);
}

#[test]
fn test_shape_wraps_bitmap_backed_only() {
    let resources = resources();
    let sketch = sketch(&resources);

    let shaped = sketch
        .state_image(
            PHOTO,
            &resize_100()
                .shape_size(ShapeSize::new(40, 40))
                .shaper(Arc::new(CircleShaper)),
        )
        .unwrap();
    assert!(matches!(shaped, Drawable::Shape(_)));
    assert_eq!(shaped.intrinsic_size(), Some((40, 40)));
    assert_eq!(shaped.image_from(), Some(ImageFrom::Local));

    let color = sketch
        .state_image(SWATCH, &DisplayOptions::new().shaper(Arc::new(CircleShaper)))
        .unwrap();
    assert!(matches!(color, Drawable::Color(_)));
}

#[test]
fn test_shape_options_share_cache_entry() {
    let resources = resources();
    let sketch = sketch(&resources);

    sketch.state_image(PHOTO, &resize_100()).unwrap();
    let shaped = sketch
        .state_image(PHOTO, &resize_100().shaper(Arc::new(CircleShaper)))
        .unwrap();
    assert_eq!(shaped.image_from(), Some(ImageFrom::MemoryCache));
    assert_eq!(sketch.configuration().memory_cache().len(), 1);
}

#[test]
fn test_concurrent_requests_process_once() {
    let resources = resources();
    let processor = Arc::new(CountingProcessor {
        calls: AtomicUsize::new(0),
        delay: Duration::from_millis(20),
    });
    let sketch = Arc::new(sketch(&resources));
    let options = Arc::new(resize_100().processor(processor.clone()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let sketch = Arc::clone(&sketch);
            let options = Arc::clone(&options);
            thread::spawn(move || sketch.state_image(PHOTO, &options).map(|d| d.image_from()))
        })
        .collect();
    let froms: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap().unwrap())
        .collect();

    assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        froms
            .iter()
            .filter(|from| **from == Some(ImageFrom::Local))
            .count(),
        1
    );
    assert_eq!(sketch.configuration().memory_cache().len(), 1);
}

#[test]
fn test_state_images_in_parallel() {
    let resources = resources();
    let processor = Arc::new(CountingProcessor::default());
    let sketch = sketch(&resources);
    let options = resize_100().processor(processor.clone());

    let results = sketch.state_images(&[PHOTO, PHOTO, SWATCH, PHOTO], &options);
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|result| result.is_ok()));
    assert_eq!(processor.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unmatched_uri_is_not_cached() {
    let resources = resources();
    let sketch = Pixcache::new(
        Configuration::builder(Context::new(resources.clone()))
            .uri_registry(UriRegistry::builder().model(FileUriModel).build().unwrap())
            .build(),
    );

    let first = sketch.state_image(PHOTO, &resize_100()).unwrap();
    let second = sketch.state_image(PHOTO, &resize_100()).unwrap();
    assert_eq!(first.image_from(), Some(ImageFrom::Local));
    assert_eq!(second.image_from(), Some(ImageFrom::Local));
    assert!(sketch.configuration().memory_cache().is_empty());

    drop(first);
    assert_eq!(sketch.configuration().bitmap_pool().stats().puts, 1);
}

#[test]
fn test_recycled_output_fails_decode() {
    let resources = resources();
    let sketch = sketch(&resources);
    let options = resize_100().processor(Arc::new(RecycledProcessor));

    let err = sketch.state_image(PHOTO, &options).unwrap_err();
    assert!(matches!(err, PixError::DecodeFailed(_)));
    assert!(sketch.configuration().memory_cache().is_empty());
}

#[test]
fn test_missing_resource_fails_decode() {
    let resources = resources();
    let sketch = sketch(&resources);

    let err = sketch.state_image(99, &resize_100()).unwrap_err();
    assert!(matches!(err, PixError::DecodeFailed(_)));
}

#[test]
fn test_trim_memory_releases_unused() {
    let resources = resources();
    let sketch = sketch(&resources);

    let held = sketch.state_image(PHOTO, &resize_100()).unwrap();
    sketch
        .state_image(PHOTO, &DisplayOptions::new().resize(Resize::new(50, 50)))
        .unwrap();
    sketch.trim_memory(pixcache::core::pool::TrimLevel::Complete);

    let config = sketch.configuration();
    assert!(config.memory_cache().is_empty());
    assert_eq!(config.bitmap_pool().size(), 0);
    assert!(!held.bitmap().unwrap().is_recycled());
}
