use image::ImageError;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PixError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unsupported uri: {0}")]
    UnsupportedUri(String),

    #[error("Invalid uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Duplicate uri model: {0}")]
    DuplicateUriModel(String),

    #[error("Data source error for {uri}: {reason}")]
    DataSource { uri: String, reason: String },

    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: u64 },

    #[error(transparent)]
    ProcessImage(Box<ProcessImageError>),

    #[error("Invalid size: {0}")]
    InvalidSize(String),
}

impl PixError {
    pub fn is_out_of_memory(&self) -> bool {
        match self {
            Self::OutOfMemory { .. } => true,
            Self::ProcessImage(err) => err.cause.is_out_of_memory(),
            _ => false,
        }
    }
}

/// Memory usage snapshot attached to processing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub cache_size: u64,
    pub cache_max: u64,
    pub pool_size: u64,
    pub pool_max: u64,
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memoryInfo: cacheSize={}, cacheMax={}, poolSize={}, poolMax={}",
            format_bytes(self.cache_size),
            format_bytes(self.cache_max),
            format_bytes(self.pool_size),
            format_bytes(self.pool_max)
        )
    }
}

#[derive(Error, Debug)]
#[error("process image failed. uri: {uri}. processor: {processor}. {stats}")]
pub struct ProcessImageError {
    pub uri: String,
    pub processor: String,
    pub stats: MemoryStats,
    #[source]
    pub cause: Box<PixError>,
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if value.fract() == 0.0 {
        format!("{}{}", value as u64, UNITS[unit])
    } else {
        format!("{:.2}{}", value, UNITS[unit])
    }
}

pub type PixResult<T> = Result<T, PixError>;
