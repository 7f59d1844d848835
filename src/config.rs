// In: src/config.rs

//! The single source of truth for all superchunk configuration.
//!
//! `SchunkConfig` describes how one container compresses its chunks and is frozen
//! for the lifetime of that container (the container keeps it behind an `Arc`).
//! `PipelineConfig` wraps it with the settings of the generate / transform / scan
//! driver. Both are plain serde structs so they can be built in code, loaded from
//! JSON, or filled in from CLI flags at the application boundary.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchunkError;

//==================================================================================
// 0. Limits
//==================================================================================

/// Maximum number of filters in a container's filter pipeline.
pub const MAX_FILTERS: usize = 6;
/// Highest accepted compression level.
pub const MAX_CLEVEL: u8 = 9;
/// Largest element size the chunk header can describe.
pub const MAX_TYPESIZE: usize = u8::MAX as usize;

//==================================================================================
// I. Codec & Filter Identities
//==================================================================================

/// Identity of the block codec used for every chunk of a container.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Blocks are stored as-is after filtering.
    None,
    /// **Default:** LZ4 block format. Fast, modest ratio; the level only steers block size.
    #[default]
    Lz4,
    /// Zstandard. Slower, better ratio on filtered float data.
    Zstd,
}

impl CodecKind {
    /// The identifier written into chunk headers.
    pub fn id(self) -> u8 {
        match self {
            CodecKind::None => 0,
            CodecKind::Lz4 => 1,
            CodecKind::Zstd => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(CodecKind::None),
            1 => Some(CodecKind::Lz4),
            2 => Some(CodecKind::Zstd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::None => "none",
            CodecKind::Lz4 => "lz4",
            CodecKind::Zstd => "zstd",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = SchunkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CodecKind::None),
            "lz4" => Ok(CodecKind::Lz4),
            "zstd" => Ok(CodecKind::Zstd),
            other => Err(SchunkError::Configuration(format!(
                "unknown codec '{}' (expected none, lz4 or zstd)",
                other
            ))),
        }
    }
}

/// A single step of the filter pipeline, with its parameter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum FilterKind {
    Identity,
    /// Keep only `bits` significant mantissa bits of every float (lossy).
    TruncPrec { bits: u8 },
    /// Byte-plane shuffle by element size.
    Shuffle,
    /// XOR every element with its predecessor.
    Delta,
}

impl FilterKind {
    /// The `(id, param)` pair written into chunk headers.
    pub fn to_wire(self) -> (u8, u8) {
        match self {
            FilterKind::Identity => (0, 0),
            FilterKind::TruncPrec { bits } => (1, bits),
            FilterKind::Shuffle => (2, 0),
            FilterKind::Delta => (3, 0),
        }
    }

    pub fn from_wire(id: u8, param: u8) -> Option<Self> {
        match id {
            0 => Some(FilterKind::Identity),
            1 => Some(FilterKind::TruncPrec { bits: param }),
            2 => Some(FilterKind::Shuffle),
            3 => Some(FilterKind::Delta),
            _ => None,
        }
    }

    /// Checks the filter's parameter against the element size it will run on.
    fn validate(self, typesize: usize) -> Result<(), SchunkError> {
        if let FilterKind::TruncPrec { bits } = self {
            if typesize != 4 && typesize != 8 {
                return Err(SchunkError::Configuration(format!(
                    "trunc_prec needs 4- or 8-byte floats, container typesize is {}",
                    typesize
                )));
            }
            if bits == 0 {
                return Err(SchunkError::Configuration(
                    "trunc_prec must retain at least one mantissa bit".to_string(),
                ));
            }
        }
        Ok(())
    }
}

//==================================================================================
// II. Container Configuration
//==================================================================================

/// Everything a container needs to compress and decompress its chunks.
/// Immutable once the container is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SchunkConfig {
    /// Size in bytes of one logical element.
    #[serde(default = "default_typesize")]
    pub typesize: usize,

    /// **The number of elements in every chunk.** Partial chunks are rejected.
    #[serde(default = "default_chunk_len")]
    pub chunk_len: usize,

    #[serde(default)]
    pub codec: CodecKind,

    /// Compression level, 0 (store) to 9.
    #[serde(default = "default_clevel")]
    pub clevel: u8,

    /// Filters applied in order before compression and undone in reverse after.
    #[serde(default = "default_filters")]
    pub filters: Vec<FilterKind>,

    /// Bytes per independently compressed block. `0` selects a size from the level.
    #[serde(default)]
    pub blocksize: usize,

    /// Thread count hint for block-parallel compression and decompression.
    #[serde(default = "default_nthreads")]
    pub nthreads: usize,
}

impl Default for SchunkConfig {
    fn default() -> Self {
        Self {
            typesize: default_typesize(),
            chunk_len: default_chunk_len(),
            codec: CodecKind::default(),
            clevel: default_clevel(),
            filters: default_filters(),
            blocksize: 0,
            nthreads: default_nthreads(),
        }
    }
}

impl SchunkConfig {
    /// A default configuration for `f64` chunks of `chunk_len` elements.
    pub fn for_f64(chunk_len: usize) -> Self {
        Self {
            typesize: std::mem::size_of::<f64>(),
            chunk_len,
            ..Self::default()
        }
    }

    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_clevel(mut self, clevel: u8) -> Self {
        self.clevel = clevel;
        self
    }

    pub fn with_filters(mut self, filters: Vec<FilterKind>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_blocksize(mut self, blocksize: usize) -> Self {
        self.blocksize = blocksize;
        self
    }

    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads;
        self
    }

    /// Uncompressed size of one chunk in bytes. Saturates on configurations that
    /// `validate` rejects.
    pub fn chunk_nbytes(&self) -> usize {
        self.chunk_len.saturating_mul(self.typesize)
    }

    /// Rejects configurations a container cannot be built from.
    pub fn validate(&self) -> Result<(), SchunkError> {
        if self.typesize == 0 || self.typesize > MAX_TYPESIZE {
            return Err(SchunkError::Configuration(format!(
                "typesize must be between 1 and {}, got {}",
                MAX_TYPESIZE, self.typesize
            )));
        }
        if self.chunk_len == 0 {
            return Err(SchunkError::Configuration(
                "chunk_len must be greater than zero".to_string(),
            ));
        }
        let nbytes = self.chunk_len.checked_mul(self.typesize).ok_or_else(|| {
            SchunkError::Configuration(format!(
                "chunk of {} elements of {} bytes overflows the address space",
                self.chunk_len, self.typesize
            ))
        })?;
        if nbytes > u32::MAX as usize {
            return Err(SchunkError::Configuration(format!(
                "chunk of {} bytes exceeds the 4 GiB chunk limit",
                nbytes
            )));
        }
        if self.clevel > MAX_CLEVEL {
            return Err(SchunkError::Configuration(format!(
                "clevel must be between 0 and {}, got {}",
                MAX_CLEVEL, self.clevel
            )));
        }
        if self.filters.len() > MAX_FILTERS {
            return Err(SchunkError::Configuration(format!(
                "at most {} filters are supported, got {}",
                MAX_FILTERS,
                self.filters.len()
            )));
        }
        for filter in &self.filters {
            filter.validate(self.typesize)?;
        }
        if self.nthreads == 0 {
            return Err(SchunkError::Configuration(
                "nthreads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_typesize() -> usize {
    std::mem::size_of::<f64>()
}

/// 200k doubles, which fits comfortably in a modern L3 cache.
fn default_chunk_len() -> usize {
    200_000
}

fn default_clevel() -> u8 {
    5
}

fn default_filters() -> Vec<FilterKind> {
    vec![FilterKind::Shuffle]
}

fn default_nthreads() -> usize {
    1
}

//==================================================================================
// III. Pipeline Configuration
//==================================================================================

/// How the transform phase walks the input container.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// **Default:** one chunk at a time, in index order.
    #[default]
    Sequential,
    /// Batches of chunks are transformed and compressed on a rayon pool, then
    /// appended in index order.
    ChunkParallel,
}

/// What the scan does when a chunk fails to decode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// **Default:** abort the run and return the decode error.
    #[default]
    Halt,
    /// Log, record the chunk index as skipped and continue. Roots inside or at the
    /// edges of a skipped chunk may be lost.
    SkipChunk,
}

/// Settings for the generate / transform / scan driver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Number of chunks to generate.
    #[serde(default = "default_nchunks")]
    pub nchunks: usize,

    /// The generated x values cover `[0, span)`.
    #[serde(default = "default_span")]
    pub span: f64,

    /// Roots of the cubic applied in the transform phase.
    #[serde(default = "default_roots")]
    pub roots: [f64; 3],

    /// Configuration shared by the x and y containers.
    #[serde(default = "default_pipeline_schunk")]
    pub schunk: SchunkConfig,

    #[serde(default)]
    pub transform_mode: TransformMode,

    #[serde(default)]
    pub decode_policy: DecodePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            nchunks: default_nchunks(),
            span: default_span(),
            roots: default_roots(),
            schunk: default_pipeline_schunk(),
            transform_mode: TransformMode::default(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration. Malformed JSON, unknown codec or
    /// filter names and invalid values all fail with `Configuration`.
    pub fn from_json_str(json: &str) -> Result<Self, SchunkError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| SchunkError::Configuration(format!("pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchunkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Total number of generated elements. Saturates on configurations that
    /// `validate` rejects.
    pub fn total_len(&self) -> usize {
        self.nchunks.saturating_mul(self.schunk.chunk_len)
    }

    pub fn validate(&self) -> Result<(), SchunkError> {
        self.schunk.validate()?;
        if self.schunk.typesize != std::mem::size_of::<f64>() {
            return Err(SchunkError::Configuration(format!(
                "the root-finding pipeline works on f64 data, typesize is {}",
                self.schunk.typesize
            )));
        }
        if self.nchunks == 0 {
            return Err(SchunkError::Configuration(
                "nchunks must be greater than zero".to_string(),
            ));
        }
        let total_bytes = self
            .nchunks
            .checked_mul(self.schunk.chunk_len)
            .and_then(|len| len.checked_mul(self.schunk.typesize));
        if total_bytes.is_none() {
            return Err(SchunkError::Configuration(format!(
                "{} chunks of {} elements overflow the address space",
                self.nchunks, self.schunk.chunk_len
            )));
        }
        if !self.span.is_finite() || self.span <= 0.0 {
            return Err(SchunkError::Configuration(format!(
                "span must be a positive finite number, got {}",
                self.span
            )));
        }
        Ok(())
    }
}

fn default_nchunks() -> usize {
    500
}

fn default_span() -> f64 {
    10.0
}

fn default_roots() -> [f64; 3] {
    [1.35, 4.45, 8.5]
}

/// Doubles truncated to float precision, shuffled, LZ4 at level 5 on 4 threads.
fn default_pipeline_schunk() -> SchunkConfig {
    SchunkConfig {
        filters: vec![FilterKind::TruncPrec { bits: 23 }, FilterKind::Shuffle],
        nthreads: 4,
        ..SchunkConfig::default()
    }
}

//==================================================================================
// IV. Unit Tests
//==================================================================================
