use crate::{image::transform::ScalingMode, PixError, PixResult};
use image::RgbaImage;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeSize {
    pub width: u32,
    pub height: u32,
}

impl ShapeSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FromStr for ShapeSize {
    type Err = PixError;

    fn from_str(s: &str) -> PixResult<Self> {
        let (width, height) = parse_size(s)?;
        Ok(Self::new(width, height))
    }
}

/// Parses `WxH` with both sides non-zero.
pub(crate) fn parse_size(s: &str) -> PixResult<(u32, u32)> {
    let invalid = || PixError::InvalidSize(s.to_string());
    let (width, height) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = width.parse().map_err(|_| invalid())?;
    let height: u32 = height.parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

/// Clip shape applied on top of a bitmap when it is displayed.
pub trait ImageShaper: Send + Sync {
    fn key(&self) -> String;

    /// Whether pixel (`x`, `y`) of a `width` x `height` image is inside the
    /// shape.
    fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool;

    fn apply(&self, image: &mut RgbaImage) {
        let (width, height) = image.dimensions();
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if !self.contains(x, y, width, height) {
                pixel.0 = [0, 0, 0, 0];
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRectShaper {
    radius: u32,
}

impl RoundRectShaper {
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }
}

impl ImageShaper for RoundRectShaper {
    fn key(&self) -> String {
        format!("RoundRectShaper(radius={})", self.radius)
    }

    fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let radius = self.radius.min(width / 2).min(height / 2) as f64;
        if radius == 0.0 {
            return true;
        }
        let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
        let cx = px.clamp(radius, width as f64 - radius);
        let cy = py.clamp(radius, height as f64 - radius);
        let (dx, dy) = (px - cx, py - cy);
        dx * dx + dy * dy <= radius * radius
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircleShaper;

impl ImageShaper for CircleShaper {
    fn key(&self) -> String {
        "CircleShaper".to_string()
    }

    fn contains(&self, x: u32, y: u32, width: u32, height: u32) -> bool {
        let radius = width.min(height) as f64 / 2.0;
        let dx = x as f64 + 0.5 - width as f64 / 2.0;
        let dy = y as f64 + 0.5 - height as f64 / 2.0;
        dx * dx + dy * dy <= radius * radius
    }
}

/// Fits `source` to the shape size (centre crop) and masks it with the
/// shaper.
pub fn shape_image(
    source: &RgbaImage,
    shape_size: Option<ShapeSize>,
    shaper: Option<&dyn ImageShaper>,
) -> RgbaImage {
    let mut image = match shape_size {
        Some(size) if (size.width, size.height) != source.dimensions() => {
            ScalingMode::Fill.scale(source, size.width, size.height)
        }
        _ => source.clone(),
    };
    if let Some(shaper) = shaper {
        shaper.apply(&mut image);
    }
    image
}
