use crate::{
    core::context::{Context, ResId},
    state::drawable::ImageFrom,
    uri::{
        model::UriModel,
        source::{
            ByteArrayDataSource, ContentDataSource, DataSource, DownloadResult,
            DrawableDataSource, FileDataSource,
        },
    },
    PixError, PixResult,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::error;
use std::{io, sync::Arc};

fn network_data_source(
    uri: &str,
    download: Option<&DownloadResult>,
) -> PixResult<Box<dyn DataSource>> {
    match download {
        Some(DownloadResult::Bytes(bytes)) => Ok(Box::new(ByteArrayDataSource::new(
            Arc::clone(bytes),
            ImageFrom::Network,
        ))),
        Some(DownloadResult::File(path)) => {
            Ok(Box::new(FileDataSource::new(path, ImageFrom::DiskCache)))
        }
        None => Err(PixError::DataSource {
            uri: uri.to_string(),
            reason: "download result is required".to_string(),
        }),
    }
}

pub struct HttpUriModel;

impl HttpUriModel {
    pub const SCHEME: &'static str = "http://";
}

impl UriModel for HttpUriModel {
    fn name(&self) -> &'static str {
        "HttpUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn from_network(&self) -> bool {
        true
    }

    fn data_source(
        &self,
        _context: &Context,
        uri: &str,
        download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        network_data_source(uri, download)
    }
}

pub struct HttpsUriModel;

impl HttpsUriModel {
    pub const SCHEME: &'static str = "https://";
}

impl UriModel for HttpsUriModel {
    fn name(&self) -> &'static str {
        "HttpsUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn from_network(&self) -> bool {
        true
    }

    fn data_source(
        &self,
        _context: &Context,
        uri: &str,
        download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        network_data_source(uri, download)
    }
}

/// Absolute paths and `file://` uris.
pub struct FileUriModel;

impl FileUriModel {
    pub const SCHEME: &'static str = "file://";
}

impl UriModel for FileUriModel {
    fn name(&self) -> &'static str {
        "FileUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with('/') || uri.starts_with(Self::SCHEME)
    }

    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(Self::SCHEME).unwrap_or(uri)
    }

    fn data_source(
        &self,
        _context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        Ok(Box::new(FileDataSource::new(
            self.uri_content(uri),
            ImageFrom::Local,
        )))
    }
}

pub struct ContentUriModel;

impl ContentUriModel {
    pub const SCHEME: &'static str = "content://";
}

impl UriModel for ContentUriModel {
    fn name(&self) -> &'static str {
        "ContentUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn data_source(
        &self,
        context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        let resolver = context.content_resolver().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "no content resolver configured")
        })?;
        Ok(Box::new(ContentDataSource::new(Arc::clone(resolver), uri)))
    }
}

pub struct AssetUriModel;

impl AssetUriModel {
    pub const SCHEME: &'static str = "asset://";

    pub fn make_uri(asset: &str) -> String {
        format!("{}{}", Self::SCHEME, asset)
    }
}

impl UriModel for AssetUriModel {
    fn name(&self) -> &'static str {
        "AssetUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(Self::SCHEME).unwrap_or(uri)
    }

    fn data_source(
        &self,
        context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        let asset = self.uri_content(uri);
        if asset.is_empty() || asset.split('/').any(|segment| segment == "..") {
            return Err(PixError::InvalidUri {
                uri: uri.to_string(),
                reason: "invalid asset path".to_string(),
            });
        }
        let dir = context.assets_dir().ok_or_else(|| PixError::DataSource {
            uri: uri.to_string(),
            reason: "no assets directory configured".to_string(),
        })?;
        Ok(Box::new(FileDataSource::new(dir.join(asset), ImageFrom::Local)))
    }
}

pub struct DrawableUriModel;

impl DrawableUriModel {
    pub const SCHEME: &'static str = "drawable://";

    pub fn make_uri(res_id: ResId) -> String {
        format!("{}{}", Self::SCHEME, res_id)
    }

    pub fn res_id(&self, uri: &str) -> PixResult<ResId> {
        self.uri_content(uri).parse().map_err(|_| {
            let reason = format!("Conversion resId failed. {uri}");
            error!("{}", reason);
            PixError::InvalidUri {
                uri: uri.to_string(),
                reason,
            }
        })
    }
}

impl UriModel for DrawableUriModel {
    fn name(&self) -> &'static str {
        "DrawableUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(Self::SCHEME).unwrap_or(uri)
    }

    fn data_source(
        &self,
        context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        let res_id = self.res_id(uri)?;
        Ok(Box::new(DrawableDataSource::new(
            Arc::clone(context.resources()),
            res_id,
        )))
    }
}

/// `android.resource://<package>/[<type>/]<id>` uris with a numeric id.
pub struct AndroidResUriModel;

impl AndroidResUriModel {
    pub const SCHEME: &'static str = "android.resource://";
}

impl UriModel for AndroidResUriModel {
    fn name(&self) -> &'static str {
        "AndroidResUriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME)
    }

    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(Self::SCHEME).unwrap_or(uri)
    }

    fn data_source(
        &self,
        context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        let res_id = self
            .uri_content(uri)
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse::<ResId>().ok())
            .ok_or_else(|| PixError::InvalidUri {
                uri: uri.to_string(),
                reason: "resource id must be numeric".to_string(),
            })?;
        Ok(Box::new(DrawableDataSource::new(
            Arc::clone(context.resources()),
            res_id,
        )))
    }
}

/// Inline `data:image/...;base64,` uris.
pub struct Base64UriModel;

impl Base64UriModel {
    pub const SCHEME: &'static str = "data:image/";
    pub const SCHEME_SHORT: &'static str = "data:img/";
    const MARKER: &'static str = ";base64,";
}

impl UriModel for Base64UriModel {
    fn name(&self) -> &'static str {
        "Base64UriModel"
    }

    fn matches(&self, uri: &str) -> bool {
        uri.starts_with(Self::SCHEME) || uri.starts_with(Self::SCHEME_SHORT)
    }

    fn uri_content<'a>(&self, uri: &'a str) -> &'a str {
        uri.split_once(Self::MARKER)
            .map(|(_, data)| data)
            .unwrap_or(uri)
    }

    fn convert_short_uri_for_key(&self) -> bool {
        true
    }

    fn data_source(
        &self,
        _context: &Context,
        uri: &str,
        _download: Option<&DownloadResult>,
    ) -> PixResult<Box<dyn DataSource>> {
        if !uri.contains(Self::MARKER) {
            return Err(PixError::InvalidUri {
                uri: uri.to_string(),
                reason: "missing base64 payload".to_string(),
            });
        }
        let bytes = STANDARD.decode(self.uri_content(uri))?;
        Ok(Box::new(ByteArrayDataSource::new(bytes, ImageFrom::Memory)))
    }
}
