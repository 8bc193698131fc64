// src/compression/mod.rs
//! Stream decompression for uploaded packages
//!
//! Uploaded tarballs may arrive gzip-compressed (`.tar.gz`, `.tgz`, `.gz`)
//! or bare (`.tar`). ZIP archives carry their own per-entry compression and
//! never pass through here.

use std::io::Read;
use thiserror::Error;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Unsupported compression format: {0}")]
    UnsupportedFormat(String),
}

/// Compression wrapping a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw tar)
    None,
    /// Gzip compression (.gz, .tgz)
    Gzip,
}

impl CompressionFormat {
    /// Detect compression format from a file name
    ///
    /// ```
    /// use cmspack::compression::CompressionFormat;
    ///
    /// assert_eq!(CompressionFormat::from_extension("theme.tar.gz"), CompressionFormat::Gzip);
    /// assert_eq!(CompressionFormat::from_extension("theme.TGZ"), CompressionFormat::Gzip);
    /// assert_eq!(CompressionFormat::from_extension("theme.tar"), CompressionFormat::None);
    /// ```
    pub fn from_extension(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".gz") || lower.ends_with(".tgz") {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Detect compression format from magic bytes (gzip: `1f 8b`)
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Wrap `reader` in a decoder for `format`
pub fn create_decoder<'a, R: Read + 'a>(reader: R, format: CompressionFormat) -> Box<dyn Read + 'a> {
    match format {
        CompressionFormat::None => Box::new(reader),
        CompressionFormat::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
    }
}
