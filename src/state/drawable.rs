use crate::{
    core::{
        bitmap::{Bitmap, PixelFormat},
        pool::BitmapPool,
        refbitmap::RefHandle,
    },
    image::shaper::{ImageShaper, ShapeSize},
    PixError, PixResult,
};
use image::RgbaImage;
use std::{fmt, str::FromStr, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFrom {
    Network,
    DiskCache,
    Local,
    MemoryCache,
    Memory,
}

impl fmt::Display for ImageFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFrom::Network => "NETWORK",
            ImageFrom::DiskCache => "DISK_CACHE",
            ImageFrom::Local => "LOCAL",
            ImageFrom::MemoryCache => "MEMORY_CACHE",
            ImageFrom::Memory => "MEMORY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct BitmapDrawable {
    bitmap: Bitmap,
}

impl BitmapDrawable {
    pub fn new(bitmap: Bitmap) -> Self {
        Self { bitmap }
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDrawable {
    pub color: [u8; 4],
    pub size: Option<(u32, u32)>,
}

impl ColorDrawable {
    pub fn new(color: [u8; 4], size: Option<(u32, u32)>) -> Self {
        Self { color, size }
    }
}

impl FromStr for ColorDrawable {
    type Err = PixError;

    fn from_str(s: &str) -> PixResult<Self> {
        let invalid = || PixError::InvalidSize(format!("invalid color drawable '{}'", s.trim()));
        let mut parts = s.split_whitespace();
        let hex = parts
            .next()
            .and_then(|hex| hex.strip_prefix('#'))
            .filter(|hex| hex.len() == 8 && hex.is_ascii())
            .ok_or_else(invalid)?;
        let mut color = [0u8; 4];
        for (i, channel) in color.iter_mut().enumerate() {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        let size = parts
            .next()
            .map(|size| size.parse::<ShapeSize>().map(|s| (s.width, s.height)))
            .transpose()?;
        Ok(Self { color, size })
    }
}

#[derive(Debug, Clone)]
pub struct RefBitmapDrawable {
    handle: RefHandle,
    from: ImageFrom,
}

impl RefBitmapDrawable {
    pub fn new(handle: RefHandle, from: ImageFrom) -> Self {
        Self { handle, from }
    }

    pub fn handle(&self) -> &RefHandle {
        &self.handle
    }

    pub fn image_from(&self) -> ImageFrom {
        self.from
    }
}

#[derive(Clone)]
pub struct ShapeDrawable {
    inner: Box<Drawable>,
    shape_size: Option<ShapeSize>,
    shaper: Option<Arc<dyn ImageShaper>>,
}

impl ShapeDrawable {
    pub fn inner(&self) -> &Drawable {
        &self.inner
    }

    pub fn shape_size(&self) -> Option<ShapeSize> {
        self.shape_size
    }

    pub fn shaper(&self) -> Option<&Arc<dyn ImageShaper>> {
        self.shaper.as_ref()
    }
}

impl fmt::Debug for ShapeDrawable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeDrawable")
            .field("inner", &self.inner)
            .field("shape_size", &self.shape_size)
            .field("shaper", &self.shaper.as_ref().map(|shaper| shaper.key()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Drawable {
    Bitmap(BitmapDrawable),
    Color(ColorDrawable),
    Ref(RefBitmapDrawable),
    Shape(ShapeDrawable),
}

impl Drawable {
    pub fn is_bitmap_backed(&self) -> bool {
        matches!(self, Drawable::Bitmap(_) | Drawable::Ref(_))
    }

    pub fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Drawable::Bitmap(drawable) => Some(drawable.bitmap()),
            Drawable::Ref(drawable) => Some(drawable.handle().bitmap()),
            Drawable::Shape(drawable) => drawable.inner.bitmap(),
            Drawable::Color(_) => None,
        }
    }

    pub fn image_from(&self) -> Option<ImageFrom> {
        match self {
            Drawable::Ref(drawable) => Some(drawable.image_from()),
            Drawable::Shape(drawable) => drawable.inner.image_from(),
            Drawable::Bitmap(_) | Drawable::Color(_) => None,
        }
    }

    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        match self {
            Drawable::Bitmap(drawable) => Some(drawable.bitmap().size()),
            Drawable::Ref(drawable) => Some(drawable.handle().bitmap().size()),
            Drawable::Color(drawable) => drawable.size,
            Drawable::Shape(drawable) => drawable
                .shape_size
                .map(|size| (size.width, size.height))
                .or_else(|| drawable.inner.intrinsic_size()),
        }
    }

    pub fn shaped(
        self,
        shape_size: Option<ShapeSize>,
        shaper: Option<Arc<dyn ImageShaper>>,
    ) -> Drawable {
        if (shape_size.is_none() && shaper.is_none()) || !self.is_bitmap_backed() {
            return self;
        }
        Drawable::Shape(ShapeDrawable {
            inner: Box::new(self),
            shape_size,
            shaper,
        })
    }

    pub fn to_rgba(&self) -> Option<RgbaImage> {
        match self {
            Drawable::Bitmap(_) | Drawable::Ref(_) => self.bitmap()?.to_rgba(),
            Drawable::Color(drawable) => {
                let (width, height) = drawable.size?;
                let bitmap = Bitmap::new(width, height, PixelFormat::Rgba8888).ok()?;
                bitmap.fill(drawable.color).ok()?;
                bitmap.to_rgba()
            }
            Drawable::Shape(drawable) => {
                let source = drawable.inner.to_rgba()?;
                Some(crate::image::shaper::shape_image(
                    &source,
                    drawable.shape_size,
                    drawable.shaper.as_deref(),
                ))
            }
        }
    }
}

pub fn drawable_to_bitmap(
    drawable: &Drawable,
    low_quality: bool,
    pool: &BitmapPool,
) -> PixResult<Option<Bitmap>> {
    let Some((width, height)) = drawable.intrinsic_size() else {
        return Ok(None);
    };
    if width == 0 || height == 0 {
        return Ok(None);
    }
    let bitmap = pool.obtain_or_create(width, height, PixelFormat::for_quality(low_quality))?;
    let written = match drawable {
        Drawable::Color(color) => bitmap.fill(color.color),
        other => match other.to_rgba() {
            Some(image) => bitmap.write_rgba(&image),
            None => {
                pool.free(bitmap);
                return Ok(None);
            }
        },
    };
    match written {
        Ok(()) => Ok(Some(bitmap)),
        Err(err) => {
            pool.free(bitmap);
            Err(err)
        }
    }
}
