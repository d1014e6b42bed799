//! zlib compression for packet bodies.
//!
//! Frames at or above the connection's compression threshold carry a zlib
//! stream (RFC 1950). Inflation is bounded by the length the frame declares,
//! so a small frame cannot expand into an arbitrarily large allocation.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::warn;

use crate::core::MAX_UNCOMPRESSED_LENGTH;
use crate::error::{constants, ProtocolError, Result};

/// zlib level used when no level is configured.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Compress `data` into a zlib stream.
///
/// # Errors
/// Returns `ProtocolError::CompressionFailure` if the encoder fails
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        Compression::new(level.min(9)),
    );
    encoder.write_all(data).map_err(|e| {
        warn!(error = %e, "{}", constants::ERR_COMPRESSION_FAILED);
        ProtocolError::CompressionFailure
    })?;
    encoder.finish().map_err(|e| {
        warn!(error = %e, "{}", constants::ERR_COMPRESSION_FAILED);
        ProtocolError::CompressionFailure
    })
}

/// Inflate a zlib stream that must expand to exactly `expected_len` bytes.
///
/// # Errors
/// - `FrameTooLarge` if `expected_len` is above `MAX_UNCOMPRESSED_LENGTH`
/// - `DecompressionFailure` if the stream is corrupt
/// - `DecompressedLengthMismatch` if the stream expands to any other length
pub fn decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    if expected_len > MAX_UNCOMPRESSED_LENGTH {
        return Err(ProtocolError::FrameTooLarge {
            length: expected_len,
            max: MAX_UNCOMPRESSED_LENGTH,
        });
    }

    let mut out = Vec::with_capacity(expected_len);
    // Read one byte past the declared length so overlong streams are detected.
    let mut reader = ZlibDecoder::new(data).take(expected_len as u64 + 1);
    reader.read_to_end(&mut out).map_err(|e| {
        warn!(error = %e, "{}", constants::ERR_DECOMPRESSION_FAILED);
        ProtocolError::DecompressionFailure
    })?;

    if out.len() != expected_len {
        return Err(ProtocolError::DecompressedLengthMismatch {
            declared: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_zlib_roundtrip() {
        let original = b"Hello, World! This is a test of zlib compression.";
        let compressed = compress(original, DEFAULT_COMPRESSION_LEVEL).unwrap();
        // zlib header: deflate, 32K window
        assert_eq!(compressed[0], 0x78);
        let decompressed = decompress(&compressed, original.len()).unwrap();
        assert_eq!(original.as_slice(), decompressed.as_slice());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_declared_length_too_small() {
        let data = vec![7u8; 300];
        let compressed = compress(&data, 1).unwrap();
        assert!(matches!(
            decompress(&compressed, 299),
            Err(ProtocolError::DecompressedLengthMismatch {
                declared: 299,
                actual: 300
            })
        ));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_declared_length_too_large() {
        let data = vec![7u8; 300];
        let compressed = compress(&data, 1).unwrap();
        assert!(matches!(
            decompress(&compressed, 400),
            Err(ProtocolError::DecompressedLengthMismatch { actual: 300, .. })
        ));
    }

    #[test]
    fn test_malformed_stream() {
        let result = decompress(&[0x10, 0x00, 0xFF, 0xFF, 0xFF], 16);
        assert!(matches!(result, Err(ProtocolError::DecompressionFailure)));
    }

    #[test]
    fn test_declared_length_over_limit() {
        let result = decompress(&[0x78, 0x9C], MAX_UNCOMPRESSED_LENGTH + 1);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }
}
