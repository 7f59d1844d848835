// In: src/chunk/format.rs

//! Defines the self-describing byte layout of a single compressed chunk.
//! This module is the single source of truth for serializing a chunk, parsing its
//! header, and peeking at its metadata without touching the block payloads.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic "SCHK" | version u16 | typesize u8 | codec u8 | clevel u8 | nfilters u8 |
//! (filter id u8, param u8) * nfilters | nbytes u64 | blocksize u32 | nblocks u32 |
//! (csize u32, flags u8) * nblocks | block payloads
//! ```

use std::io::{Cursor, Read};

use crate::config::{CodecKind, FilterKind, MAX_FILTERS};
use crate::error::SchunkError;

//==================================================================================
// Format Constants
//==================================================================================

/// The magic number to identify an individual compressed chunk.
pub const CHUNK_MAGIC: &[u8; 4] = b"SCHK";
/// The version of the individual chunk format.
pub const CHUNK_FORMAT_VERSION: u16 = 1;
/// The minimum possible size of a valid chunk in bytes (no filters, no blocks).
pub const MIN_CHUNK_SIZE: usize = 26;
/// Block flag: the payload is the filtered block, stored without compression.
pub const BLOCK_FLAG_STORED: u8 = 0x01;

const BLOCK_ENTRY_SIZE: usize = 5;

//==================================================================================
// Public Structs
//==================================================================================

/// Location and encoding of one block inside a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEntry {
    /// Offset of the payload from the start of the chunk.
    pub offset: usize,
    /// Payload length in bytes.
    pub csize: usize,
    pub stored: bool,
}

/// The metadata extracted from a chunk header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// The version of the chunk format that was parsed.
    pub format_version: u16,
    pub typesize: usize,
    pub codec: CodecKind,
    pub clevel: u8,
    pub filters: Vec<FilterKind>,
    /// Uncompressed size of the chunk.
    pub nbytes: usize,
    /// Uncompressed size of every block but possibly the last.
    pub blocksize: usize,
    pub blocks: Vec<BlockEntry>,
    /// Size of everything before the first payload.
    pub header_size: usize,
}

impl ChunkHeader {
    /// Number of logical elements in the chunk.
    pub fn nitems(&self) -> usize {
        self.nbytes / self.typesize
    }

    /// Total compressed size, header included.
    pub fn cbytes(&self) -> usize {
        self.header_size + self.blocks.iter().map(|b| b.csize).sum::<usize>()
    }

    /// Uncompressed size of block `index`.
    pub fn block_nbytes(&self, index: usize) -> usize {
        let start = index * self.blocksize;
        self.blocksize.min(self.nbytes.saturating_sub(start))
    }

    /// Number of blocks stored without compression.
    pub fn stored_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.stored).count()
    }

    /// Peeks into a serialized chunk's header to extract metadata without reading
    /// the (potentially large) block payloads. Any inconsistency is reported as
    /// `DecodeFailed`, since a chunk only ever comes from our own writer.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchunkError> {
        if bytes.len() < MIN_CHUNK_SIZE {
            return Err(SchunkError::DecodeFailed(format!(
                "Chunk is too small to be valid. Minimum size: {}, got: {}",
                MIN_CHUNK_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let map_err = |e: std::io::Error| SchunkError::DecodeFailed(format!("chunk header: {}", e));

        // Read and validate the fixed-size portion of the header.
        let mut magic_buf = [0u8; 4];
        cursor.read_exact(&mut magic_buf).map_err(map_err)?;
        if magic_buf != *CHUNK_MAGIC {
            return Err(SchunkError::DecodeFailed("Invalid chunk magic number".into()));
        }

        let mut u16_buf = [0u8; 2];
        cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != CHUNK_FORMAT_VERSION {
            return Err(SchunkError::DecodeFailed(format!(
                "Unsupported chunk version: expected {}, got {}",
                CHUNK_FORMAT_VERSION, version
            )));
        }

        let mut fixed = [0u8; 4];
        cursor.read_exact(&mut fixed).map_err(map_err)?;
        let [typesize, codec_id, clevel, nfilters] = fixed;
        if typesize == 0 {
            return Err(SchunkError::DecodeFailed("chunk typesize is zero".into()));
        }
        let codec = CodecKind::from_id(codec_id)
            .ok_or_else(|| SchunkError::DecodeFailed(format!("unknown codec id {}", codec_id)))?;
        if nfilters as usize > MAX_FILTERS {
            return Err(SchunkError::DecodeFailed(format!(
                "chunk declares {} filters, at most {} are supported",
                nfilters, MAX_FILTERS
            )));
        }

        let mut filters = Vec::with_capacity(nfilters as usize);
        for _ in 0..nfilters {
            cursor.read_exact(&mut u16_buf).map_err(map_err)?;
            let filter = FilterKind::from_wire(u16_buf[0], u16_buf[1]).ok_or_else(|| {
                SchunkError::DecodeFailed(format!("unknown filter id {}", u16_buf[0]))
            })?;
            filters.push(filter);
        }

        let mut u64_buf = [0u8; 8];
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let nbytes = usize::try_from(u64::from_le_bytes(u64_buf))
            .map_err(|_| SchunkError::DecodeFailed("chunk size overflows usize".into()))?;

        let mut u32_buf = [0u8; 4];
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let blocksize = u32::from_le_bytes(u32_buf) as usize;
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let nblocks = u32::from_le_bytes(u32_buf) as usize;

        // SECURITY: Validate the block geometry before allocating the table.
        if nbytes % typesize as usize != 0 {
            return Err(SchunkError::DecodeFailed(format!(
                "chunk size {} is not a multiple of typesize {}",
                nbytes, typesize
            )));
        }
        if blocksize % typesize as usize != 0 {
            return Err(SchunkError::DecodeFailed(format!(
                "block size {} is not a multiple of typesize {}",
                blocksize, typesize
            )));
        }
        let expected_blocks = if blocksize == 0 {
            0
        } else {
            nbytes.div_ceil(blocksize)
        };
        if (nbytes > 0 && blocksize == 0) || nblocks != expected_blocks {
            return Err(SchunkError::DecodeFailed(format!(
                "inconsistent block geometry: {} bytes in {} blocks of {}",
                nbytes, nblocks, blocksize
            )));
        }
        let table_end = (cursor.position() as usize).saturating_add(nblocks.saturating_mul(BLOCK_ENTRY_SIZE));
        if table_end > bytes.len() {
            return Err(SchunkError::DecodeFailed(
                "Block table length exceeds buffer size".into(),
            ));
        }

        let mut blocks = Vec::with_capacity(nblocks);
        let mut offset = table_end;
        let mut flags = [0u8; 1];
        for _ in 0..nblocks {
            cursor.read_exact(&mut u32_buf).map_err(map_err)?;
            let csize = u32::from_le_bytes(u32_buf) as usize;
            cursor.read_exact(&mut flags).map_err(map_err)?;
            blocks.push(BlockEntry {
                offset,
                csize,
                stored: flags[0] & BLOCK_FLAG_STORED != 0,
            });
            offset = offset.saturating_add(csize);
        }

        // SECURITY: Final check that the sum of parts matches the buffer exactly.
        if offset != bytes.len() {
            return Err(SchunkError::DecodeFailed(format!(
                "Declared chunk size {} does not match buffer length {}",
                offset,
                bytes.len()
            )));
        }

        Ok(ChunkHeader {
            format_version: version,
            typesize: typesize as usize,
            codec,
            clevel,
            filters,
            nbytes,
            blocksize,
            blocks,
            header_size: table_end,
        })
    }
}

//==================================================================================
// Writer
//==================================================================================

/// The settings recorded in every chunk header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    pub typesize: usize,
    pub codec: CodecKind,
    pub clevel: u8,
    pub filters: Vec<FilterKind>,
    pub nbytes: usize,
    pub blocksize: usize,
}

/// Serializes encoded blocks into the canonical chunk byte layout.
/// This is the authoritative "writer" for the chunk format.
pub fn write_chunk(layout: &ChunkLayout, blocks: &[(Vec<u8>, bool)]) -> Vec<u8> {
    let header_size = MIN_CHUNK_SIZE + 2 * layout.filters.len() + BLOCK_ENTRY_SIZE * blocks.len();
    let data_size: usize = blocks.iter().map(|(payload, _)| payload.len()).sum();
    let mut final_buf = Vec::with_capacity(header_size + data_size);

    // Writing to a Vec<u8> cannot fail.
    final_buf.extend_from_slice(CHUNK_MAGIC);
    final_buf.extend_from_slice(&CHUNK_FORMAT_VERSION.to_le_bytes());
    final_buf.extend_from_slice(&[
        layout.typesize as u8,
        layout.codec.id(),
        layout.clevel,
        layout.filters.len() as u8,
    ]);
    for filter in &layout.filters {
        let (id, param) = filter.to_wire();
        final_buf.extend_from_slice(&[id, param]);
    }
    final_buf.extend_from_slice(&(layout.nbytes as u64).to_le_bytes());
    final_buf.extend_from_slice(&(layout.blocksize as u32).to_le_bytes());
    final_buf.extend_from_slice(&(blocks.len() as u32).to_le_bytes());

    for (payload, stored) in blocks {
        final_buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        final_buf.push(if *stored { BLOCK_FLAG_STORED } else { 0 });
    }
    for (payload, _) in blocks {
        final_buf.extend_from_slice(payload);
    }

    debug_assert_eq!(final_buf.len(), header_size + data_size);
    final_buf
}

//==================================================================================
// Unit Tests
//==================================================================================
