// In: src/schunk/mod.rs

//! The super-chunk: an append-only, in-memory container of compressed chunks.
//!
//! Every chunk holds exactly `chunk_len` elements and is compressed under the
//! container's frozen `SchunkConfig`. Chunk indices are dense and assigned in
//! append order. Appends take `&mut self`; every read takes `&self`, so a
//! `SuperChunk` shared by reference can be decoded from many threads at once.

use std::sync::Arc;

use bytemuck::Pod;
use rayon::ThreadPool;
use serde::Serialize;

use crate::chunk::{ChunkCodec, ChunkHeader};
use crate::config::SchunkConfig;
use crate::error::SchunkError;
use crate::utils::check_typesize;

mod frame;

pub use frame::{FRAME_FORMAT_VERSION, FRAME_MAGIC};

//==================================================================================
// 1. Statistics
//==================================================================================

/// Size accounting for a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchunkStats {
    /// Uncompressed bytes of all chunks: `nchunks * chunk_len * typesize`.
    pub logical_bytes: u64,
    /// Sum of the serialized chunk sizes, headers included.
    pub compressed_bytes: u64,
    pub nchunks: usize,
}

impl SchunkStats {
    /// Compression ratio `logical / compressed`, or 0 for an empty container.
    pub fn ratio(&self) -> f64 {
        if self.compressed_bytes == 0 {
            0.0
        } else {
            self.logical_bytes as f64 / self.compressed_bytes as f64
        }
    }
}

//==================================================================================
// 2. Container
//==================================================================================

#[derive(Debug)]
pub struct SuperChunk {
    config: Arc<SchunkConfig>,
    codec: ChunkCodec,
    chunks: Vec<Vec<u8>>,
    logical_bytes: u64,
    compressed_bytes: u64,
}

impl SuperChunk {
    /// Creates an empty container. Fails only with `Configuration`.
    pub fn new(config: SchunkConfig) -> Result<Self, SchunkError> {
        let codec = ChunkCodec::new(&config)?;
        log::debug!(
            "new super-chunk: typesize={} chunk_len={} codec={} clevel={} filters={:?} nthreads={}",
            config.typesize,
            config.chunk_len,
            config.codec,
            config.clevel,
            config.filters,
            config.nthreads
        );
        Ok(Self {
            config: Arc::new(config),
            codec,
            chunks: Vec::new(),
            logical_bytes: 0,
            compressed_bytes: 0,
        })
    }

    pub fn config(&self) -> &Arc<SchunkConfig> {
        &self.config
    }

    /// Elements per chunk.
    pub fn chunk_len(&self) -> usize {
        self.config.chunk_len
    }

    pub fn typesize(&self) -> usize {
        self.config.typesize
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The container's block pool, if it was built with more than one thread.
    pub fn thread_pool(&self) -> Option<&Arc<ThreadPool>> {
        self.codec.pool()
    }

    pub fn stats(&self) -> SchunkStats {
        SchunkStats {
            logical_bytes: self.logical_bytes,
            compressed_bytes: self.compressed_bytes,
            nchunks: self.chunks.len(),
        }
    }

    //==============================================================================
    // Writes
    //==============================================================================

    /// Compresses one chunk of raw element bytes and appends it. Returns its index.
    ///
    /// `bytes` must hold exactly `chunk_len` elements; otherwise `SizeMismatch` is
    /// returned and the container is left untouched.
    pub fn append_buffer(&mut self, bytes: &[u8]) -> Result<usize, SchunkError> {
        let expected = self.config.chunk_nbytes();
        if bytes.len() != expected {
            return Err(SchunkError::SizeMismatch {
                expected: self.config.chunk_len,
                got: bytes.len() / self.config.typesize,
            });
        }
        let chunk = self.compress_chunk(bytes)?;
        Ok(self.push(chunk))
    }

    /// Typed form of [`append_buffer`](Self::append_buffer).
    pub fn append<T: Pod>(&mut self, data: &[T]) -> Result<usize, SchunkError> {
        check_typesize::<T>(self.config.typesize)?;
        if data.len() != self.config.chunk_len {
            return Err(SchunkError::SizeMismatch {
                expected: self.config.chunk_len,
                got: data.len(),
            });
        }
        self.append_buffer(bytemuck::cast_slice(data))
    }

    /// Appends an already compressed chunk, typically produced by
    /// [`compress_chunk`](Self::compress_chunk) on another thread.
    ///
    /// The header must match this container's configuration and hold exactly
    /// `chunk_len` elements. Payloads are not decoded here.
    pub fn append_chunk(&mut self, chunk: Vec<u8>) -> Result<usize, SchunkError> {
        let header = self.codec.read_header(&chunk)?;
        if header.nitems() != self.config.chunk_len {
            return Err(SchunkError::SizeMismatch {
                expected: self.config.chunk_len,
                got: header.nitems(),
            });
        }
        Ok(self.push(chunk))
    }

    /// Compresses one chunk under this container's configuration without
    /// appending it.
    pub fn compress_chunk(&self, bytes: &[u8]) -> Result<Vec<u8>, SchunkError> {
        self.codec.compress(bytes)
    }

    fn push(&mut self, chunk: Vec<u8>) -> usize {
        let index = self.chunks.len();
        self.logical_bytes += self.config.chunk_nbytes() as u64;
        self.compressed_bytes += chunk.len() as u64;
        log_metric!("event"="append", "index"=&index, "cbytes"=&chunk.len());
        self.chunks.push(chunk);
        index
    }

    //==============================================================================
    // Reads
    //==============================================================================

    /// Raw compressed bytes of chunk `index`.
    pub fn chunk(&self, index: usize) -> Result<&[u8], SchunkError> {
        self.chunks
            .get(index)
            .map(Vec::as_slice)
            .ok_or(SchunkError::InvalidIndex {
                index,
                count: self.chunks.len(),
            })
    }

    /// Parsed header of chunk `index`, without decoding any payload.
    pub fn chunk_info(&self, index: usize) -> Result<ChunkHeader, SchunkError> {
        ChunkHeader::parse(self.chunk(index)?)
    }

    /// Decompresses chunk `index` into the front of `dest` and returns the number
    /// of bytes written.
    pub fn decompress_chunk_bytes(&self, index: usize, dest: &mut [u8]) -> Result<usize, SchunkError> {
        let chunk = self.chunk(index)?;
        self.codec.decompress_into(chunk, dest)
    }

    /// Decompresses chunk `index` into `out`, which must hold at least
    /// `chunk_len` elements. Returns the element count written.
    pub fn decompress_chunk<T: Pod>(&self, index: usize, out: &mut [T]) -> Result<usize, SchunkError> {
        check_typesize::<T>(self.config.typesize)?;
        self.chunk(index)?;
        if out.len() < self.config.chunk_len {
            return Err(SchunkError::BufferTooSmall {
                needed: self.config.chunk_len,
                got: out.len(),
            });
        }
        let written = self.decompress_chunk_bytes(index, bytemuck::cast_slice_mut(out))?;
        Ok(written / self.config.typesize)
    }

    /// Decodes elements `[start, start + out.len())` of chunk `index`, touching only
    /// the blocks that overlap the range.
    pub fn get_items<T: Pod>(&self, index: usize, start: usize, out: &mut [T]) -> Result<usize, SchunkError> {
        check_typesize::<T>(self.config.typesize)?;
        let chunk = self.chunk(index)?;
        self.codec
            .decompress_items(chunk, start, bytemuck::cast_slice_mut(out))
    }

    /// Decompresses every chunk into one vector. Intended for tests and small data.
    pub fn to_vec<T: Pod>(&self) -> Result<Vec<T>, SchunkError> {
        check_typesize::<T>(self.config.typesize)?;
        let mut out = vec![bytemuck::Zeroable::zeroed(); self.chunks.len() * self.config.chunk_len];
        if self.config.chunk_len == 0 {
            return Ok(out);
        }
        for (index, slot) in out.chunks_exact_mut(self.config.chunk_len).enumerate() {
            self.decompress_chunk(index, slot)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests;
