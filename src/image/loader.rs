use crate::{
    core::{bitmap::Bitmap, context::ResId},
    state::drawable::{BitmapDrawable, ColorDrawable, Drawable},
    uri::source::DataSource,
    PixError, PixResult,
};
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use log::warn;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt, fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

const RESOURCE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "bmp", "color"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(mime_type: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            mime_type: mime_type.into(),
            width,
            height,
        }
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageInfo({},{}x{})", self.mime_type, self.width, self.height)
    }
}

/// Static image resources addressed by numeric id.
pub trait Resources: Send + Sync {
    /// The platform drawable for `id`. Bitmap drawables returned here are
    /// owned by the resources and must never be pooled.
    fn drawable(&self, id: ResId) -> Option<Drawable>;

    /// Encoded bounds of `id` without decoding pixels.
    fn bounds(&self, id: ResId) -> Option<ImageInfo>;

    fn raw(&self, id: ResId) -> io::Result<Vec<u8>>;
}

pub struct ImageLoader;

impl ImageLoader {
    pub fn decode(source: &dyn DataSource) -> PixResult<RgbaImage> {
        let bytes = source.read_all()?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    pub fn bounds(bytes: &[u8]) -> PixResult<ImageInfo> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let mime_type = reader
            .format()
            .map(|format| format.to_mime_type())
            .ok_or_else(|| PixError::DecodeFailed("unknown image format".into()))?;
        let (width, height) = reader.into_dimensions()?;
        Ok(ImageInfo::new(mime_type, width, height))
    }

    pub fn encode_png(image: &RgbaImage) -> PixResult<Vec<u8>> {
        let mut encoded = Vec::new();
        DynamicImage::ImageRgba8(image.clone())
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;
        Ok(encoded)
    }
}

/// Resources stored as `<id>.<ext>` files in one directory. A `.color`
/// file holds a non-bitmap drawable such as `#ff0000ff 48x48`.
pub struct DirResources {
    dir: PathBuf,
}

impl DirResources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn find(&self, id: ResId) -> Option<PathBuf> {
        RESOURCE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{id}.{ext}")))
            .find(|path| path.is_file())
    }

    fn load(path: &Path) -> PixResult<Drawable> {
        if is_color(path) {
            let text = fs::read_to_string(path)?;
            return Ok(Drawable::Color(text.parse::<ColorDrawable>()?));
        }
        let image = image::open(path)?.to_rgba8();
        Ok(Drawable::Bitmap(BitmapDrawable::new(Bitmap::wrap(image, false))))
    }
}

impl Resources for DirResources {
    fn drawable(&self, id: ResId) -> Option<Drawable> {
        let path = self.find(id)?;
        match Self::load(&path) {
            Ok(drawable) => Some(drawable),
            Err(err) => {
                warn!("Failed to load resource {} from {}: {}", id, path.display(), err);
                None
            }
        }
    }

    fn bounds(&self, id: ResId) -> Option<ImageInfo> {
        let path = self.find(id).filter(|path| !is_color(path))?;
        let bytes = fs::read(&path).ok()?;
        ImageLoader::bounds(&bytes).ok()
    }

    fn raw(&self, id: ResId) -> io::Result<Vec<u8>> {
        let path = self.find(id).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("resource {id} not found"))
        })?;
        fs::read(path)
    }
}

fn is_color(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "color")
}

enum MemoryResource {
    Image { bitmap: Bitmap, encoded: Vec<u8> },
    Color(ColorDrawable),
}

/// In-process resources. Each image keeps one shared platform bitmap, the
/// way a resource table hands out the same pixels on every lookup.
#[derive(Default)]
pub struct MemoryResources {
    entries: RwLock<HashMap<ResId, MemoryResource>>,
    loads: AtomicUsize,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&self, id: ResId, image: RgbaImage) -> PixResult<()> {
        let encoded = ImageLoader::encode_png(&image)?;
        let bitmap = Bitmap::wrap(image, false);
        self.entries
            .write()
            .insert(id, MemoryResource::Image { bitmap, encoded });
        Ok(())
    }

    pub fn insert_color(&self, id: ResId, drawable: ColorDrawable) {
        self.entries
            .write()
            .insert(id, MemoryResource::Color(drawable));
    }

    pub fn bitmap(&self, id: ResId) -> Option<Bitmap> {
        match self.entries.read().get(&id)? {
            MemoryResource::Image { bitmap, .. } => Some(bitmap.clone()),
            MemoryResource::Color(_) => None,
        }
    }

    /// Number of `drawable` lookups served so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl Resources for MemoryResources {
    fn drawable(&self, id: ResId) -> Option<Drawable> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        match self.entries.read().get(&id)? {
            MemoryResource::Image { bitmap, .. } => {
                Some(Drawable::Bitmap(BitmapDrawable::new(bitmap.clone())))
            }
            MemoryResource::Color(color) => Some(Drawable::Color(*color)),
        }
    }

    fn bounds(&self, id: ResId) -> Option<ImageInfo> {
        match self.entries.read().get(&id)? {
            MemoryResource::Image { encoded, .. } => ImageLoader::bounds(encoded).ok(),
            MemoryResource::Color(_) => None,
        }
    }

    fn raw(&self, id: ResId) -> io::Result<Vec<u8>> {
        match self.entries.read().get(&id) {
            Some(MemoryResource::Image { encoded, .. }) => Ok(encoded.clone()),
            Some(MemoryResource::Color(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("resource {id} is not an encoded image"),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("resource {id} not found"),
            )),
        }
    }
}
