use crate::{
    core::{config::Configuration, context::ResId, pool::TrimLevel},
    state::{drawable::Drawable, options::DisplayOptions, resolver::MakerStateImage},
    uri::source::{DataSource, DownloadResult},
    utils::error::{format_bytes, PixError, PixResult},
};
use log::{debug, info};
use rayon::prelude::*;

pub struct Pixcache {
    config: Configuration,
}

impl Pixcache {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn state_image(&self, res_id: ResId, options: &DisplayOptions) -> PixResult<Drawable> {
        MakerStateImage::new(res_id).drawable(&self.config, options)
    }

    pub fn state_images(
        &self,
        res_ids: &[ResId],
        options: &DisplayOptions,
    ) -> Vec<PixResult<Drawable>> {
        debug!("Resolving {} state images", res_ids.len());
        res_ids
            .par_iter()
            .map(|&res_id| self.state_image(res_id, options))
            .collect()
    }

    pub fn data_source(
        &self,
        uri: &str,
        download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        let model = self
            .config
            .uri_registry()
            .match_uri(uri)
            .ok_or_else(|| PixError::UnsupportedUri(uri.to_string()))?;
        debug!("{} handles {}", model.name(), uri);
        model.data_source(self.config.context(), uri, download)
    }

    pub fn trim_memory(&self, level: TrimLevel) {
        let cache = self.config.memory_cache();
        let pool = self.config.bitmap_pool();
        cache.trim(level);
        pool.trim(level);
        info!(
            "Trimmed memory ({:?}). cache {}, pool {}",
            level,
            format_bytes(cache.size()),
            format_bytes(pool.size())
        );
    }
}
