//! Payload compression providers
//!
//! Node payloads may be compressed before they are written to the ensemble.
//! The path is passed through so providers can vary behavior per subtree.

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt::Debug;
use std::io::{Read, Write};

use crate::{Error, Result};

/// Codec applied to node payloads
pub trait CompressionProvider: Debug + Send + Sync {
    /// Compress the payload stored at `path`
    fn compress(&self, path: &str, data: &[u8]) -> Result<Bytes>;

    /// Decompress the payload read from `path`
    fn decompress(&self, path: &str, compressed: &[u8]) -> Result<Bytes>;
}

/// Gzip codec (the default provider)
#[derive(Debug, Clone)]
pub struct GzipCompressionProvider {
    level: Compression,
}

impl GzipCompressionProvider {
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Use a specific gzip level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionProvider for GzipCompressionProvider {
    fn compress(&self, path: &str, data: &[u8]) -> Result<Bytes> {
        let encode_error = |e: std::io::Error| Error::Compression {
            path: path.to_string(),
            message: format!("gzip encode failed: {}", e),
        };

        let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 16), self.level);
        encoder.write_all(data).map_err(encode_error)?;
        let out = encoder.finish().map_err(encode_error)?;
        Ok(Bytes::from(out))
    }

    fn decompress(&self, path: &str, compressed: &[u8]) -> Result<Bytes> {
        let mut decoder = GzDecoder::new(compressed);
        let mut out = Vec::with_capacity(compressed.len() * 2);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| Error::Compression {
                path: path.to_string(),
                message: format!("gzip decode failed: {}", e),
            })?;
        Ok(Bytes::from(out))
    }
}

/// Identity codec
#[derive(Debug, Clone, Default)]
pub struct NoCompressionProvider;

impl CompressionProvider for NoCompressionProvider {
    fn compress(&self, _path: &str, data: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(data))
    }

    fn decompress(&self, _path: &str, compressed: &[u8]) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(compressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_shrinks_repetitive_payload() {
        let provider = GzipCompressionProvider::new();
        let payload = b"leader-election ".repeat(256);

        let compressed = provider.compress("/locks/a", &payload).unwrap();
        assert!(compressed.len() < payload.len());

        let restored = provider.decompress("/locks/a", &compressed).unwrap();
        assert_eq!(&restored[..], &payload[..]);
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let provider = GzipCompressionProvider::new();
        let err = provider
            .decompress("/config", b"definitely not gzip")
            .unwrap_err();
        assert!(matches!(err, Error::Compression { ref path, .. } if path == "/config"));
    }

    #[test]
    fn test_no_compression_is_identity() {
        let provider = NoCompressionProvider;
        let compressed = provider.compress("/x", b"abc").unwrap();
        assert_eq!(&compressed[..], b"abc");
    }
}
