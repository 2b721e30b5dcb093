use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgba, RgbaImage};
use pixcache::{
    core::context::ContentResolver,
    image::loader::{ImageLoader, MemoryResources},
    state::drawable::ImageFrom,
    uri::{
        model::UriRegistry,
        source::{DataSource, DownloadResult},
    },
    Configuration, Context, PixError, PixResult, Pixcache,
};
use std::{
    fs,
    io::{self, Cursor, Read},
    sync::Arc,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    ImageLoader::encode_png(&RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255]))).unwrap()
}

fn sketch_with(context: Context) -> Pixcache {
    Pixcache::new(Configuration::builder(context).build())
}

fn sketch() -> Pixcache {
    let resources = Arc::new(MemoryResources::new());
    resources
        .insert_image(7, RgbaImage::from_pixel(3, 5, Rgba([0, 0, 0, 255])))
        .unwrap();
    sketch_with(Context::new(resources))
}

fn open_err(result: PixResult<Box<dyn DataSource>>) -> PixError {
    match result {
        Ok(_) => panic!("data source should not open"),
        Err(err) => err,
    }
}

struct StaticResolver(Vec<u8>);

impl ContentResolver for StaticResolver {
    fn open(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
        if uri.ends_with("/denied") {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(Box::new(Cursor::new(self.0.clone())))
    }
}

#[test]
fn test_default_registry_order() {
    assert_eq!(
        UriRegistry::default().names(),
        vec![
            "HttpUriModel",
            "HttpsUriModel",
            "FileUriModel",
            "ContentUriModel",
            "AssetUriModel",
            "DrawableUriModel",
            "AndroidResUriModel",
            "Base64UriModel",
        ]
    );
}

#[test]
fn test_file_uri() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, png(4, 6)).unwrap();
    let sketch = sketch();

    for uri in [
        path.display().to_string(),
        format!("file://{}", path.display()),
    ] {
        let source = sketch.data_source(&uri, None).unwrap();
        assert_eq!(source.image_from(), ImageFrom::Local);
        assert_eq!(source.length().unwrap(), fs::metadata(&path).unwrap().len());
        let image = ImageLoader::decode(source.as_ref()).unwrap();
        assert_eq!(image.dimensions(), (4, 6));
    }
}

#[test]
fn test_empty_file_reads_nothing() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let source = sketch()
        .data_source(&file.path().display().to_string(), None)
        .unwrap();
    assert!(source.read_all().unwrap().is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let uri = dir.path().join("missing.png").display().to_string();
    let source = sketch().data_source(&uri, None).unwrap();
    assert!(matches!(source.open(), Err(PixError::IoError(_))));
}

#[test]
fn test_base64_uri() {
    let bytes = png(2, 2);
    let sketch = sketch();

    for prefix in ["data:image/png;base64,", "data:img/png;base64,"] {
        let uri = format!("{}{}", prefix, STANDARD.encode(&bytes));
        let source = sketch.data_source(&uri, None).unwrap();
        assert_eq!(source.image_from(), ImageFrom::Memory);
        assert_eq!(source.read_all().unwrap(), bytes);
    }

    let err = open_err(sketch.data_source("data:image/png;base64,@@@", None));
    assert!(matches!(err, PixError::Base64(_)));
    let err = open_err(sketch.data_source("data:image/png,plain", None));
    assert!(matches!(err, PixError::InvalidUri { .. }));
}

#[test]
fn test_network_uri_needs_download() {
    let sketch = sketch();

    let err = open_err(sketch.data_source("http://example.com/a.png", None));
    assert!(matches!(err, PixError::DataSource { .. }));

    let download = DownloadResult::Bytes(Arc::from(png(1, 1)));
    let source = sketch
        .data_source("https://example.com/a.png", Some(&download))
        .unwrap();
    assert_eq!(source.image_from(), ImageFrom::Network);

    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), png(1, 1)).unwrap();
    let download = DownloadResult::File(file.path().to_path_buf());
    let source = sketch
        .data_source("http://example.com/a.png", Some(&download))
        .unwrap();
    assert_eq!(source.image_from(), ImageFrom::DiskCache);
    assert_eq!(ImageLoader::bounds(&source.read_all().unwrap()).unwrap().width, 1);
}

#[test]
fn test_content_uri() {
    let refused = open_err(sketch().data_source("content://media/1", None));
    assert!(matches!(refused, PixError::IoError(_)));

    let resources = Arc::new(MemoryResources::new());
    let sketch = sketch_with(
        Context::new(resources).with_content_resolver(Arc::new(StaticResolver(png(2, 3)))),
    );
    let source = sketch.data_source("content://media/1", None).unwrap();
    assert_eq!(ImageLoader::decode(source.as_ref()).unwrap().dimensions(), (2, 3));

    let denied = sketch.data_source("content://media/denied", None).unwrap();
    assert!(matches!(denied.open(), Err(PixError::IoError(_))));
}

#[test]
fn test_asset_uri() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("icons")).unwrap();
    fs::write(dir.path().join("icons/star.png"), png(8, 8)).unwrap();
    let resources = Arc::new(MemoryResources::new());
    let sketch = sketch_with(Context::new(resources).with_assets_dir(dir.path()));

    let source = sketch.data_source("asset://icons/star.png", None).unwrap();
    assert_eq!(ImageLoader::decode(source.as_ref()).unwrap().dimensions(), (8, 8));

    let err = open_err(sketch.data_source("asset://../secret.png", None));
    assert!(matches!(err, PixError::InvalidUri { .. }));
}

#[test]
fn test_resource_uris() {
    let sketch = sketch();

    let source = sketch.data_source("drawable://7", None).unwrap();
    assert_eq!(ImageLoader::decode(source.as_ref()).unwrap().dimensions(), (3, 5));

    let source = sketch
        .data_source("android.resource://com.example/drawable/7", None)
        .unwrap();
    assert_eq!(ImageLoader::decode(source.as_ref()).unwrap().dimensions(), (3, 5));

    let err = open_err(sketch.data_source("drawable://seven", None));
    assert!(matches!(err, PixError::InvalidUri { .. }));
}

#[test]
fn test_unsupported_uri() {
    let err = open_err(sketch().data_source("ftp://example.com/a.png", None));
    assert!(matches!(err, PixError::UnsupportedUri(uri) if uri == "ftp://example.com/a.png"));
}

#[test]
fn test_injected_registry_only_knows_its_models() {
    let resources = Arc::new(MemoryResources::new());
    let sketch = Pixcache::new(
        Configuration::builder(Context::new(resources))
            .uri_registry(
                UriRegistry::builder()
                    .model(pixcache::uri::schemes::Base64UriModel)
                    .build()
                    .unwrap(),
            )
            .build(),
    );

    let err = open_err(sketch.data_source("/tmp/a.png", None));
    assert!(matches!(err, PixError::UnsupportedUri(_)));
}

#[test]
fn test_duplicate_models_rejected() {
    let err = UriRegistry::builder()
        .model(pixcache::uri::schemes::FileUriModel)
        .model(pixcache::uri::schemes::FileUriModel)
        .build()
        .unwrap_err();
    assert!(matches!(err, PixError::DuplicateUriModel(name) if name == "FileUriModel"));
}
