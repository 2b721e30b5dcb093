use crate::{
    core::{
        bitmap::{Bitmap, PixelFormat},
        pool::BitmapPool,
    },
    image::shaper::parse_size,
    PixError, PixResult,
};
use image::{imageops, imageops::FilterType, RgbaImage};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalingMode {
    Fill,
    Fit,
    Stretch,
}

impl ScalingMode {
    /// Output dimensions for a `width` x `height` source scaled into the
    /// target box.
    pub fn target_size(
        &self,
        (width, height): (u32, u32),
        target_width: u32,
        target_height: u32,
    ) -> (u32, u32) {
        match self {
            ScalingMode::Fill | ScalingMode::Stretch => (target_width, target_height),
            ScalingMode::Fit => {
                let ratio =
                    (target_width as f64 / width as f64).min(target_height as f64 / height as f64);
                (
                    ((width as f64 * ratio) as u32).max(1),
                    ((height as f64 * ratio) as u32).max(1),
                )
            }
        }
    }

    pub fn scale(&self, image: &RgbaImage, target_width: u32, target_height: u32) -> RgbaImage {
        match self {
            ScalingMode::Stretch => {
                imageops::resize(image, target_width, target_height, FilterType::Lanczos3)
            }
            ScalingMode::Fit => {
                let (new_width, new_height) =
                    self.target_size(image.dimensions(), target_width, target_height);
                imageops::resize(image, new_width, new_height, FilterType::Lanczos3)
            }
            ScalingMode::Fill => {
                let (width, height) = image.dimensions();
                let ratio =
                    (target_width as f64 / width as f64).max(target_height as f64 / height as f64);

                let new_width = ((width as f64 * ratio).ceil() as u32).max(target_width);
                let new_height = ((height as f64 * ratio).ceil() as u32).max(target_height);

                let scaled = imageops::resize(image, new_width, new_height, FilterType::Lanczos3);
                let x = (new_width - target_width) / 2;
                let y = (new_height - target_height) / 2;
                imageops::crop_imm(&scaled, x, y, target_width, target_height).to_image()
            }
        }
    }
}

impl FromStr for ScalingMode {
    type Err = PixError;

    fn from_str(s: &str) -> PixResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fill" => Ok(ScalingMode::Fill),
            "fit" => Ok(ScalingMode::Fit),
            "stretch" => Ok(ScalingMode::Stretch),
            other => Err(PixError::InvalidSize(format!("unknown scaling mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub scaling: ScalingMode,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scaling: ScalingMode::Fill,
        }
    }

    pub fn with_scaling(mut self, scaling: ScalingMode) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn key(&self) -> String {
        format!("Resize({}x{},{:?})", self.width, self.height, self.scaling)
    }
}

impl FromStr for Resize {
    type Err = PixError;

    fn from_str(s: &str) -> PixResult<Self> {
        let (width, height) = parse_size(s)?;
        Ok(Self::new(width, height))
    }
}

impl fmt::Display for Resize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Turns an input bitmap into an output bitmap.
///
/// Returning a handle to the input means "unchanged". New outputs should be
/// allocated through `pool` so allocation failure surfaces as
/// [`PixError::OutOfMemory`].
pub trait ImageProcessor: Send + Sync {
    fn key(&self) -> String;

    fn process(
        &self,
        pool: &BitmapPool,
        bitmap: &Bitmap,
        resize: Option<&Resize>,
        low_quality: bool,
    ) -> PixResult<Bitmap>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResizeProcessor;

impl ImageProcessor for ResizeProcessor {
    fn key(&self) -> String {
        "ResizeProcessor".to_string()
    }

    fn process(
        &self,
        pool: &BitmapPool,
        bitmap: &Bitmap,
        resize: Option<&Resize>,
        low_quality: bool,
    ) -> PixResult<Bitmap> {
        let Some(resize) = resize else {
            return Ok(bitmap.clone());
        };
        if resize.width == 0 || resize.height == 0 {
            return Err(PixError::InvalidSize(resize.key()));
        }

        let format = PixelFormat::for_quality(low_quality);
        let (width, height) = resize
            .scaling
            .target_size(bitmap.size(), resize.width, resize.height);
        if (width, height) == bitmap.size() && format == bitmap.format() {
            return Ok(bitmap.clone());
        }
        let Some(source) = bitmap.to_rgba() else {
            return Ok(bitmap.clone());
        };

        let output = pool.obtain_or_create(width, height, format)?;
        let scaled = if (width, height) == source.dimensions() {
            source
        } else {
            resize.scaling.scale(&source, resize.width, resize.height)
        };
        if let Err(err) = output.write_rgba(&scaled) {
            pool.free(output);
            return Err(err);
        }
        Ok(output)
    }
}
