use crate::image::{
    shaper::{ImageShaper, ShapeSize},
    transform::{ImageProcessor, Resize},
};
use std::{fmt, sync::Arc};

#[derive(Clone, Default)]
pub struct DisplayOptions {
    pub processor: Option<Arc<dyn ImageProcessor>>,
    pub resize: Option<Resize>,
    pub shape_size: Option<ShapeSize>,
    pub shaper: Option<Arc<dyn ImageShaper>>,
    pub low_quality_image: bool,
}

impl DisplayOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn resize(mut self, resize: Resize) -> Self {
        self.resize = Some(resize);
        self
    }

    pub fn shape_size(mut self, shape_size: ShapeSize) -> Self {
        self.shape_size = Some(shape_size);
        self
    }

    pub fn shaper(mut self, shaper: Arc<dyn ImageShaper>) -> Self {
        self.shaper = Some(shaper);
        self
    }

    pub fn low_quality_image(mut self, low_quality: bool) -> Self {
        self.low_quality_image = low_quality;
        self
    }

    pub fn needs_processing(&self) -> bool {
        self.processor.is_some() || self.resize.is_some()
    }

    pub fn state_image_key(&self) -> String {
        let mut key = String::new();
        if let Some(resize) = &self.resize {
            key.push('_');
            key.push_str(&resize.key());
        }
        if self.low_quality_image {
            key.push_str("_LowQualityImage");
        }
        if let Some(processor) = &self.processor {
            key.push('_');
            key.push_str(&processor.key());
        }
        key
    }
}

impl fmt::Debug for DisplayOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayOptions")
            .field("processor", &self.processor.as_ref().map(|p| p.key()))
            .field("resize", &self.resize)
            .field("shape_size", &self.shape_size)
            .field("shaper", &self.shaper.as_ref().map(|s| s.key()))
            .field("low_quality_image", &self.low_quality_image)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{shaper::CircleShaper, transform::ResizeProcessor};

    #[test]
    fn test_state_image_key() {
        assert_eq!(DisplayOptions::new().state_image_key(), "");

        let options = DisplayOptions::new()
            .resize(Resize::new(100, 100))
            .low_quality_image(true)
            .processor(Arc::new(ResizeProcessor));
        assert_eq!(
            options.state_image_key(),
            "_Resize(100x100,Fill)_LowQualityImage_ResizeProcessor"
        );

        let shaped = DisplayOptions::new()
            .resize(Resize::new(100, 100))
            .shaper(Arc::new(CircleShaper));
        assert_eq!(shaped.state_image_key(), "_Resize(100x100,Fill)");
    }

    #[test]
    fn test_needs_processing() {
        assert!(!DisplayOptions::new().shaper(Arc::new(CircleShaper)).needs_processing());
        assert!(DisplayOptions::new().resize(Resize::new(1, 1)).needs_processing());
        assert!(DisplayOptions::new()
            .processor(Arc::new(ResizeProcessor))
            .needs_processing());
    }
}
