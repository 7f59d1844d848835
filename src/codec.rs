// In: src/codec.rs

//! The codec adapter: the only boundary to the external compression libraries.
//!
//! A `Codec` compresses one filtered block and restores it to an exact, known
//! size. Codecs are selected by `CodecKind` and shared as `Arc<dyn Codec>`, so a
//! different compressor can be plugged in without touching the chunk or
//! container logic. The "never fails, store instead" policy lives one level up
//! in the chunk codec, which flags a block as stored when compression errors or
//! does not pay off.

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::CodecKind;
use crate::error::SchunkError;
use crate::kernels;

/// A lossless block compressor.
pub trait Codec: Send + Sync + Debug {
    fn kind(&self) -> CodecKind;

    /// Compresses `input` at the container level `clevel` (0-9).
    fn compress(&self, input: &[u8], clevel: u8) -> Result<Vec<u8>, SchunkError>;

    /// Restores a block to exactly `capacity` bytes or fails with `DecodeFailed`.
    fn decompress(&self, input: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError>;
}

/// Returns the shared codec implementation for `kind`.
pub fn codec_for(kind: CodecKind) -> Arc<dyn Codec> {
    match kind {
        CodecKind::None => Arc::new(StoreCodec),
        CodecKind::Lz4 => Arc::new(Lz4Codec),
        CodecKind::Zstd => Arc::new(ZstdCodec),
    }
}

//==================================================================================
// Implementations
//==================================================================================

/// Copies bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCodec;

impl Codec for StoreCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::None
    }

    fn compress(&self, input: &[u8], _clevel: u8) -> Result<Vec<u8>, SchunkError> {
        Ok(input.to_vec())
    }

    fn decompress(&self, input: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError> {
        if input.len() != capacity {
            return Err(SchunkError::DecodeFailed(format!(
                "stored block holds {} bytes, expected {}",
                input.len(),
                capacity
            )));
        }
        Ok(input.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl Codec for Lz4Codec {
    fn kind(&self) -> CodecKind {
        CodecKind::Lz4
    }

    fn compress(&self, input: &[u8], _clevel: u8) -> Result<Vec<u8>, SchunkError> {
        Ok(kernels::lz4::encode(input))
    }

    fn decompress(&self, input: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError> {
        kernels::lz4::decode(input, capacity)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl Codec for ZstdCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn compress(&self, input: &[u8], clevel: u8) -> Result<Vec<u8>, SchunkError> {
        kernels::zstd::encode(input, clevel)
    }

    fn decompress(&self, input: &[u8], capacity: usize) -> Result<Vec<u8>, SchunkError> {
        kernels::zstd::decode(input, capacity)
    }
}
