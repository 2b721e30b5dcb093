use crate::{
    core::{cache::CacheKey, context::Context},
    uri::{
        schemes::{
            AndroidResUriModel, AssetUriModel, Base64UriModel, ContentUriModel, DrawableUriModel,
            FileUriModel, HttpUriModel, HttpsUriModel,
        },
        source::{DataSource, DownloadResult},
    },
    PixError, PixResult,
};
use std::{collections::HashSet, fmt, sync::Arc};

/// Scheme matcher and data source factory for one family of uris.
/// Implementations hold no per-request state.
pub trait UriModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, uri: &str) -> bool;

    /// The part of `uri` after the scheme.
    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri
    }

    /// Whether cache keys should use a digest instead of the raw uri.
    fn convert_short_uri_for_key(&self) -> bool {
        false
    }

    fn from_network(&self) -> bool {
        false
    }

    fn data_source(
        &self,
        context: &Context,
        uri: &str,
        download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>>;

    fn cache_key(&self, uri: &str, options_key: &str) -> CacheKey {
        CacheKey::derive(uri, self.convert_short_uri_for_key(), options_key)
    }
}

/// Ordered list of uri models; the first model that matches wins.
#[derive(Clone)]
pub struct UriRegistry {
    models: Vec<Arc<dyn UriModel>>,
}

impl UriRegistry {
    pub fn builder() -> UriRegistryBuilder {
        UriRegistryBuilder { models: Vec::new() }
    }

    pub fn match_uri(&self, uri: &str) -> Option<&Arc<dyn UriModel>> {
        self.models.iter().find(|model| model.matches(uri))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.models.iter().map(|model| model.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for UriRegistry {
    fn default() -> Self {
        Self {
            models: vec![
                Arc::new(HttpUriModel),
                Arc::new(HttpsUriModel),
                Arc::new(FileUriModel),
                Arc::new(ContentUriModel),
                Arc::new(AssetUriModel),
                Arc::new(DrawableUriModel),
                Arc::new(AndroidResUriModel),
                Arc::new(Base64UriModel),
            ],
        }
    }
}

impl fmt::Debug for UriRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

pub struct UriRegistryBuilder {
    models: Vec<Arc<dyn UriModel>>,
}

impl UriRegistryBuilder {
    pub fn model(mut self, model: impl UriModel + 'static) -> Self {
        self.models.push(Arc::new(model));
        self
    }

    pub fn shared(mut self, model: Arc<dyn UriModel>) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> PixResult<UriRegistry> {
        let mut names = HashSet::new();
        for model in &self.models {
            if !names.insert(model.name()) {
                return Err(PixError::DuplicateUriModel(model.name().to_string()));
            }
        }
        Ok(UriRegistry {
            models: self.models,
        })
    }
}
