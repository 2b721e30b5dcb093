use crate::{
    core::context::{ContentResolver, ResId},
    image::loader::Resources,
    state::drawable::ImageFrom,
    PixResult,
};
use memmap2::Mmap;
use std::{
    fs::File,
    io::{Cursor, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Bytes fetched ahead of time for network uris.
#[derive(Debug, Clone)]
pub enum DownloadResult {
    Bytes(Arc<[u8]>),
    File(PathBuf),
}

/// Readable origin of an image's encoded bytes.
pub trait DataSource: Send {
    fn open(&self) -> PixResult<Box<dyn Read + Send>>;

    fn length(&self) -> PixResult<u64>;

    fn image_from(&self) -> ImageFrom;

    fn read_all(&self) -> PixResult<Vec<u8>> {
        let mut bytes = Vec::new();
        self.open()?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

pub struct FileDataSource {
    path: PathBuf,
    from: ImageFrom,
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>, from: ImageFrom) -> Self {
        Self {
            path: path.into(),
            from,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileDataSource {
    fn open(&self) -> PixResult<Box<dyn Read + Send>> {
        let file = File::open(&self.path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Box::new(Cursor::new(Vec::new())));
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Box::new(Cursor::new(mmap)))
    }

    fn length(&self) -> PixResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn image_from(&self) -> ImageFrom {
        self.from
    }
}

pub struct ByteArrayDataSource {
    bytes: Arc<[u8]>,
    from: ImageFrom,
}

impl ByteArrayDataSource {
    pub fn new(bytes: impl Into<Arc<[u8]>>, from: ImageFrom) -> Self {
        Self {
            bytes: bytes.into(),
            from,
        }
    }
}

impl DataSource for ByteArrayDataSource {
    fn open(&self) -> PixResult<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }

    fn length(&self) -> PixResult<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn image_from(&self) -> ImageFrom {
        self.from
    }

    fn read_all(&self) -> PixResult<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

pub struct ContentDataSource {
    resolver: Arc<dyn ContentResolver>,
    uri: String,
}

impl ContentDataSource {
    pub fn new(resolver: Arc<dyn ContentResolver>, uri: impl Into<String>) -> Self {
        Self {
            resolver,
            uri: uri.into(),
        }
    }
}

impl DataSource for ContentDataSource {
    fn open(&self) -> PixResult<Box<dyn Read + Send>> {
        Ok(self.resolver.open(&self.uri)?)
    }

    fn length(&self) -> PixResult<u64> {
        Ok(self.resolver.length(&self.uri)?)
    }

    fn image_from(&self) -> ImageFrom {
        ImageFrom::Local
    }
}

pub struct DrawableDataSource {
    resources: Arc<dyn Resources>,
    res_id: ResId,
}

impl DrawableDataSource {
    pub fn new(resources: Arc<dyn Resources>, res_id: ResId) -> Self {
        Self { resources, res_id }
    }

    pub fn res_id(&self) -> ResId {
        self.res_id
    }
}

impl DataSource for DrawableDataSource {
    fn open(&self) -> PixResult<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.resources.raw(self.res_id)?)))
    }

    fn length(&self) -> PixResult<u64> {
        Ok(self.resources.raw(self.res_id)?.len() as u64)
    }

    fn image_from(&self) -> ImageFrom {
        ImageFrom::Local
    }
}
