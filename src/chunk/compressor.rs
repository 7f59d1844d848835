// In: src/chunk/compressor.rs

//! The chunk codec: turns one chunk of raw element bytes into a self-describing
//! compressed chunk and back.
//!
//! A chunk is split into blocks of `blocksize` bytes. Each block runs through the
//! filter pipeline and then the block codec, independently of its neighbours, so
//! blocks can be encoded and decoded on the container's rayon pool and a reader can
//! decode just the blocks covering an item range.
//!
//! Compression never fails because of the codec: a block whose compressed form is
//! not smaller than its filtered form, or whose codec returns an error, is written
//! as-is and flagged `stored` in the block table.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::chunk::format::{write_chunk, ChunkHeader, ChunkLayout};
use crate::codec::{codec_for, Codec};
use crate::config::{CodecKind, FilterKind, SchunkConfig};
use crate::error::SchunkError;
use crate::filter::FilterPipeline;

/// Compresses and decompresses chunks for a single container configuration.
#[derive(Debug)]
pub struct ChunkCodec {
    typesize: usize,
    clevel: u8,
    blocksize_hint: usize,
    codec: Arc<dyn Codec>,
    filter_kinds: Vec<FilterKind>,
    filters: FilterPipeline,
    pool: Option<Arc<ThreadPool>>,
}

impl ChunkCodec {
    /// Builds the codec for `config`. A rayon pool is only created when more than
    /// one thread is requested.
    pub fn new(config: &SchunkConfig) -> Result<Self, SchunkError> {
        config.validate()?;
        let pool = if config.nthreads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.nthreads)
                .thread_name(|i| format!("superchunk-block-{}", i))
                .build()?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self {
            typesize: config.typesize,
            clevel: config.clevel,
            blocksize_hint: config.blocksize,
            codec: codec_for(config.codec),
            filter_kinds: config.filters.clone(),
            filters: FilterPipeline::new(&config.filters, config.typesize),
            pool,
        })
    }

    /// The pool blocks run on, if any. Shared with chunk-level parallel work.
    pub fn pool(&self) -> Option<&Arc<ThreadPool>> {
        self.pool.as_ref()
    }

    /// Picks the block size for a chunk of `nbytes` bytes.
    ///
    /// An explicit size wins. Otherwise larger levels get larger blocks, and zstd
    /// gets four times more room since it needs a longer window to pay off. The
    /// result is a multiple of `typesize` and never exceeds the chunk.
    pub fn compute_blocksize(&self, nbytes: usize) -> usize {
        if nbytes == 0 {
            return 0;
        }

        let mut blocksize = if self.blocksize_hint > 0 {
            self.blocksize_hint
        } else {
            let base = match self.clevel {
                0 => nbytes,
                1..=3 => 16 * 1024,
                4..=6 => 32 * 1024,
                7..=8 => 64 * 1024,
                _ => 128 * 1024,
            };
            if self.codec.kind() == CodecKind::Zstd && self.clevel > 0 {
                base * 4
            } else {
                base
            }
        };

        blocksize = blocksize.min(nbytes);
        blocksize -= blocksize % self.typesize;
        blocksize.max(self.typesize)
    }

    //==============================================================================
    // Compression
    //==============================================================================

    /// Compresses a whole chunk. `src.len()` must be a multiple of `typesize`.
    pub fn compress(&self, src: &[u8]) -> Result<Vec<u8>, SchunkError> {
        if src.len() % self.typesize != 0 {
            return Err(SchunkError::BufferMismatch(src.len(), self.typesize));
        }

        let blocksize = self.compute_blocksize(src.len());
        let blocks: Vec<(Vec<u8>, bool)> = if src.is_empty() {
            Vec::new()
        } else {
            match &self.pool {
                Some(pool) if src.len() > blocksize => pool.install(|| {
                    src.par_chunks(blocksize)
                        .map(|block| self.encode_block(block))
                        .collect::<Result<Vec<_>, _>>()
                })?,
                _ => src
                    .chunks(blocksize)
                    .map(|block| self.encode_block(block))
                    .collect::<Result<Vec<_>, _>>()?,
            }
        };

        let layout = ChunkLayout {
            typesize: self.typesize,
            codec: self.codec.kind(),
            clevel: self.clevel,
            filters: self.filter_kinds.clone(),
            nbytes: src.len(),
            blocksize,
        };
        Ok(write_chunk(&layout, &blocks))
    }

    /// Filters and compresses one block. Returns the payload and its `stored` flag.
    fn encode_block(&self, block: &[u8]) -> Result<(Vec<u8>, bool), SchunkError> {
        let filtered = self.filters.apply(block)?;
        if self.clevel == 0 || self.codec.kind() == CodecKind::None {
            return Ok((filtered, true));
        }

        match self.codec.compress(&filtered, self.clevel) {
            Ok(compressed) if compressed.len() < filtered.len() => Ok((compressed, false)),
            Ok(_) => Ok((filtered, true)),
            Err(e) => {
                log::warn!(
                    "{} failed on a {}-byte block, storing it uncompressed: {}",
                    self.codec.kind(),
                    filtered.len(),
                    e
                );
                Ok((filtered, true))
            }
        }
    }

    //==============================================================================
    // Decompression
    //==============================================================================

    /// Parses `chunk` and checks that it was written under this configuration.
    pub fn read_header(&self, chunk: &[u8]) -> Result<ChunkHeader, SchunkError> {
        let header = ChunkHeader::parse(chunk)?;
        if header.typesize != self.typesize {
            return Err(SchunkError::DecodeFailed(format!(
                "chunk typesize {} differs from container typesize {}",
                header.typesize, self.typesize
            )));
        }
        if header.codec != self.codec.kind() {
            return Err(SchunkError::DecodeFailed(format!(
                "chunk codec {} differs from container codec {}",
                header.codec,
                self.codec.kind()
            )));
        }
        if header.filters != self.filter_kinds {
            return Err(SchunkError::DecodeFailed(format!(
                "chunk filters {:?} differ from container filters {:?}",
                header.filters, self.filter_kinds
            )));
        }
        Ok(header)
    }

    /// Decompresses a whole chunk into the front of `dest` and returns the number of
    /// bytes written.
    pub fn decompress_into(&self, chunk: &[u8], dest: &mut [u8]) -> Result<usize, SchunkError> {
        let header = self.read_header(chunk)?;
        if dest.len() < header.nbytes {
            return Err(SchunkError::BufferTooSmall {
                needed: header.nitems(),
                got: dest.len() / self.typesize,
            });
        }
        if header.nbytes == 0 {
            return Ok(0);
        }

        let dest = &mut dest[..header.nbytes];
        let decode_one = |(index, out): (usize, &mut [u8])| -> Result<(), SchunkError> {
            let block = self.decode_block(chunk, &header, index)?;
            out.copy_from_slice(&block);
            Ok(())
        };

        match &self.pool {
            Some(pool) if header.blocks.len() > 1 => pool.install(|| {
                dest.par_chunks_mut(header.blocksize)
                    .enumerate()
                    .try_for_each(decode_one)
            })?,
            _ => dest
                .chunks_mut(header.blocksize)
                .enumerate()
                .try_for_each(decode_one)?,
        }
        Ok(header.nbytes)
    }

    /// Decodes only the blocks overlapping items `[start_item, start_item + n)`,
    /// where `n = dest.len() / typesize`, and copies that range into `dest`.
    pub fn decompress_items(
        &self,
        chunk: &[u8],
        start_item: usize,
        dest: &mut [u8],
    ) -> Result<usize, SchunkError> {
        if dest.len() % self.typesize != 0 {
            return Err(SchunkError::BufferMismatch(dest.len(), self.typesize));
        }
        let header = self.read_header(chunk)?;
        let nitems = dest.len() / self.typesize;
        let available = header.nitems().saturating_sub(start_item);
        if start_item > header.nitems() || nitems > available {
            return Err(SchunkError::SizeMismatch {
                expected: available,
                got: nitems,
            });
        }
        if nitems == 0 {
            return Ok(0);
        }

        let start = start_item * self.typesize;
        let end = start + dest.len();
        let first_block = start / header.blocksize;
        let last_block = (end - 1) / header.blocksize;

        for index in first_block..=last_block {
            let block = self.decode_block(chunk, &header, index)?;
            let block_start = index * header.blocksize;
            let lo = start.max(block_start);
            let hi = end.min(block_start + block.len());
            dest[lo - start..hi - start].copy_from_slice(&block[lo - block_start..hi - block_start]);
        }
        Ok(nitems)
    }

    /// Restores block `index` of a parsed chunk to its original bytes.
    fn decode_block(
        &self,
        chunk: &[u8],
        header: &ChunkHeader,
        index: usize,
    ) -> Result<Vec<u8>, SchunkError> {
        let entry = header.blocks[index];
        let expected = header.block_nbytes(index);
        let payload = &chunk[entry.offset..entry.offset + entry.csize];

        let filtered = if entry.stored {
            if payload.len() != expected {
                return Err(SchunkError::DecodeFailed(format!(
                    "stored block {} holds {} bytes, expected {}",
                    index,
                    payload.len(),
                    expected
                )));
            }
            payload.to_vec()
        } else {
            self.codec.decompress(payload, expected)?
        };

        let restored = self
            .filters
            .invert(filtered)
            .map_err(|e| SchunkError::DecodeFailed(format!("block {}: {}", index, e)))?;
        if restored.len() != expected {
            return Err(SchunkError::DecodeFailed(format!(
                "block {} restored to {} bytes, expected {}",
                index,
                restored.len(),
                expected
            )));
        }
        Ok(restored)
    }
}
