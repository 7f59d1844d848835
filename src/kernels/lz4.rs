//! LZ4 block compression and decompression of a single block.
//!
//! The raw LZ4 block format carries no length header; the chunk header already
//! records every block's uncompressed size, so decoding is given the exact
//! capacity. Wraps `lz4_flex`, which is pure Rust and panic-free on bad input.

use crate::error::SchunkError;

/// Compresses a byte slice into a raw LZ4 block. LZ4 has no levels.
pub fn encode(input_bytes: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(input_bytes)
}

/// Decompresses a raw LZ4 block that must expand to exactly `capacity` bytes.
pub fn decode(input_bytes: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError> {
    let decompressed = lz4_flex::block::decompress(input_bytes, capacity)
        .map_err(|e| SchunkError::DecodeFailed(format!("lz4: {}", e)))?;

    if decompressed.len() != capacity {
        return Err(SchunkError::DecodeFailed(format!(
            "lz4: decompressed size does not match block size. Expected {}, got {}.",
            capacity,
            decompressed.len()
        )));
    }
    Ok(decompressed)
}
