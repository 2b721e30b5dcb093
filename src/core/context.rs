use crate::image::loader::Resources;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

pub type ResId = u32;

pub trait ContentResolver: Send + Sync {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>>;

    fn length(&self, uri: &str) -> io::Result<u64> {
        let mut stream = self.open(uri)?;
        io::copy(&mut stream, &mut io::sink())
    }
}

#[derive(Clone)]
pub struct Context {
    resources: Arc<dyn Resources>,
    content_resolver: Option<Arc<dyn ContentResolver>>,
    assets_dir: Option<PathBuf>,
}

impl Context {
    pub fn new(resources: Arc<dyn Resources>) -> Self {
        Self {
            resources,
            content_resolver: None,
            assets_dir: None,
        }
    }

    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content_resolver = Some(resolver);
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }

    pub fn resources(&self) -> &Arc<dyn Resources> {
        &self.resources
    }

    pub fn content_resolver(&self) -> Option<&Arc<dyn ContentResolver>> {
        self.content_resolver.as_ref()
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }
}
