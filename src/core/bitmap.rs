use crate::utils::error::{PixError, PixResult};
use image::{Rgba, RgbaImage};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8888,
    Rgb565,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb565 => 2,
        }
    }

    pub fn for_quality(low_quality: bool) -> Self {
        if low_quality {
            PixelFormat::Rgb565
        } else {
            PixelFormat::Rgba8888
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Rgba8888 => f.write_str("RGBA_8888"),
            PixelFormat::Rgb565 => f.write_str("RGB_565"),
        }
    }
}

struct BitmapInner {
    width: u32,
    height: u32,
    format: PixelFormat,
    mutable: bool,
    pixels: RwLock<Vec<u8>>,
    recycled: AtomicBool,
}

#[derive(Clone)]
pub struct Bitmap {
    inner: Arc<BitmapInner>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> PixResult<Self> {
        let len = byte_len(width, height, format)?;
        let pixels = alloc_pixels(len)?;
        Ok(Self::from_parts(width, height, format, pixels, true))
    }

    pub fn wrap(image: RgbaImage, mutable: bool) -> Self {
        let (width, height) = image.dimensions();
        Self::from_parts(
            width,
            height,
            PixelFormat::Rgba8888,
            image.into_raw(),
            mutable,
        )
    }

    fn from_parts(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
        mutable: bool,
    ) -> Self {
        Self {
            inner: Arc::new(BitmapInner {
                width,
                height,
                format,
                mutable,
                pixels: RwLock::new(pixels),
                recycled: AtomicBool::new(false),
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    pub fn is_mutable(&self) -> bool {
        self.inner.mutable
    }

    pub fn byte_count(&self) -> u64 {
        self.inner.width as u64 * self.inner.height as u64 * self.inner.format.bytes_per_pixel() as u64
    }

    pub fn is_recycled(&self) -> bool {
        self.inner.recycled.load(Ordering::Acquire)
    }

    pub fn recycle(&self) -> bool {
        if self.inner.recycled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut pixels = self.inner.pixels.write();
        *pixels = Vec::new();
        true
    }

    pub fn same(a: &Bitmap, b: &Bitmap) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub fn erase(&self) {
        if self.is_recycled() {
            return;
        }
        self.inner.pixels.write().fill(0);
    }

    pub fn to_rgba(&self) -> Option<RgbaImage> {
        let pixels = self.inner.pixels.read();
        if self.is_recycled() {
            return None;
        }
        let (width, height) = self.size();
        match self.inner.format {
            PixelFormat::Rgba8888 => RgbaImage::from_raw(width, height, pixels.clone()),
            PixelFormat::Rgb565 => {
                let mut image = RgbaImage::new(width, height);
                for (pixel, chunk) in image.pixels_mut().zip(pixels.chunks_exact(2)) {
                    *pixel = unpack_565(u16::from_le_bytes([chunk[0], chunk[1]]));
                }
                Some(image)
            }
        }
    }

    pub fn write_rgba(&self, image: &RgbaImage) -> PixResult<()> {
        if image.dimensions() != self.size() {
            return Err(PixError::InvalidSize(format!(
                "{}x{} into {}",
                image.width(),
                image.height(),
                self
            )));
        }
        let mut pixels = self.inner.pixels.write();
        if self.is_recycled() {
            return Err(PixError::DecodeFailed(format!("write into recycled {self}")));
        }
        match self.inner.format {
            PixelFormat::Rgba8888 => pixels.copy_from_slice(image.as_raw()),
            PixelFormat::Rgb565 => {
                for (chunk, pixel) in pixels.chunks_exact_mut(2).zip(image.pixels()) {
                    chunk.copy_from_slice(&pack_565(pixel).to_le_bytes());
                }
            }
        }
        Ok(())
    }

    pub fn fill(&self, color: [u8; 4]) -> PixResult<()> {
        let mut pixels = self.inner.pixels.write();
        if self.is_recycled() {
            return Err(PixError::DecodeFailed(format!("fill recycled {self}")));
        }
        match self.inner.format {
            PixelFormat::Rgba8888 => {
                for chunk in pixels.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&color);
                }
            }
            PixelFormat::Rgb565 => {
                let packed = pack_565(&Rgba(color)).to_le_bytes();
                for chunk in pixels.chunks_exact_mut(2) {
                    chunk.copy_from_slice(&packed);
                }
            }
        }
        Ok(())
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bitmap(@{:x},{}x{},{})",
            self.address(),
            self.width(),
            self.height(),
            self.format()
        )
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("format", &self.format())
            .field("mutable", &self.is_mutable())
            .field("recycled", &self.is_recycled())
            .finish()
    }
}

fn byte_len(width: u32, height: u32, format: PixelFormat) -> PixResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(format.bytes_per_pixel()))
        .ok_or(PixError::OutOfMemory { bytes: u64::MAX })
}

fn alloc_pixels(len: usize) -> PixResult<Vec<u8>> {
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|_| PixError::OutOfMemory { bytes: len as u64 })?;
    pixels.resize(len, 0);
    Ok(pixels)
}

fn pack_565(pixel: &Rgba<u8>) -> u16 {
    let [r, g, b, _] = pixel.0;
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

fn unpack_565(value: u16) -> Rgba<u8> {
    let r = ((value >> 11) & 0x1f) as u8;
    let g = ((value >> 5) & 0x3f) as u8;
    let b = (value & 0x1f) as u8;
    Rgba([(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xff])
}
