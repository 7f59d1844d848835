//! This module contains the pure, stateless kernels for performing
//! Zstandard compression and decompression of a single block.
//!
//! It takes a block that has already been through the filter pipeline and applies
//! the entropy coder. The caller always knows the decompressed size (it is the
//! block size recorded in the chunk header), so decoding verifies it exactly.
//! Corrupt input surfaces as `DecodeFailed`, never as a panic.

use std::io::Write;
use zstd::stream::Encoder;

use crate::error::SchunkError;

//==================================================================================
// 1. Level Mapping
//==================================================================================

/// Maps the container's 0-9 compression level onto the zstd level range.
pub fn zstd_level(clevel: u8) -> i32 {
    match clevel {
        0 => 1,
        9.. => *zstd::compression_level_range().end(),
        level => 2 * level as i32 - 1,
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Compresses a byte slice into a single zstd frame.
pub fn encode(input_bytes: &[u8], clevel: u8) -> Result<Vec<u8>, SchunkError> {
    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2);

    let mut encoder = Encoder::new(&mut output_buf, zstd_level(clevel))
        .map_err(|e| SchunkError::Codec(format!("zstd: {}", e)))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| SchunkError::Codec(format!("zstd: {}", e)))?;

    // The frame is only complete once `finish` writes the epilogue.
    encoder
        .finish()
        .map_err(|e| SchunkError::Codec(format!("zstd: {}", e)))?;

    Ok(output_buf)
}

/// Decompresses a zstd frame that must expand to exactly `capacity` bytes.
pub fn decode(input_bytes: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError> {
    // The bulk API refuses to grow past `capacity`, so a corrupt frame cannot
    // balloon memory.
    let decompressed_data = zstd::bulk::decompress(input_bytes, capacity)
        .map_err(|e| SchunkError::DecodeFailed(format!("zstd: {}", e)))?;

    if decompressed_data.len() != capacity {
        return Err(SchunkError::DecodeFailed(format!(
            "zstd: decompressed size does not match block size. Expected {}, got {}.",
            capacity,
            decompressed_data.len()
        )));
    }

    Ok(decompressed_data)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
