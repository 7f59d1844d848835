// In: src/schunk/frame.rs

//! Persistence of a whole container as a single "frame".
//!
//! Layout (little-endian):
//!
//! ```text
//! magic "SCFR" | version u16 | config_len u32 | config JSON |
//! nchunks u64 | chunk_len u64 * nchunks | chunk bytes
//! ```
//!
//! The frame is only a wrapper: every chunk keeps its own self-describing header,
//! and loading re-validates each one against the stored configuration.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::SuperChunk;
use crate::config::SchunkConfig;
use crate::error::SchunkError;

pub const FRAME_MAGIC: &[u8; 4] = b"SCFR";
pub const FRAME_FORMAT_VERSION: u16 = 1;

/// Upper bound for the embedded configuration JSON.
const MAX_CONFIG_LEN: usize = 1 << 20;

fn frame_err(context: &str, e: impl std::fmt::Display) -> SchunkError {
    SchunkError::FrameFormatError(format!("{}: {}", context, e))
}

impl SuperChunk {
    /// Serializes the container to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), SchunkError> {
        let config_json = serde_json::to_vec(self.config.as_ref())?;

        writer.write_all(FRAME_MAGIC)?;
        writer.write_all(&FRAME_FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(config_json.len() as u32).to_le_bytes())?;
        writer.write_all(&config_json)?;
        writer.write_all(&(self.chunks.len() as u64).to_le_bytes())?;
        for chunk in &self.chunks {
            writer.write_all(&(chunk.len() as u64).to_le_bytes())?;
        }
        for chunk in &self.chunks {
            writer.write_all(chunk)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rebuilds a container from a frame produced by [`write_to`](Self::write_to).
    ///
    /// Any structural problem, including a chunk whose header disagrees with the
    /// stored configuration, is reported as `FrameFormatError`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, SchunkError> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|e| frame_err("reading magic", e))?;
        if magic != *FRAME_MAGIC {
            return Err(SchunkError::FrameFormatError(
                "Invalid frame magic number".into(),
            ));
        }

        let mut u16_buf = [0u8; 2];
        reader
            .read_exact(&mut u16_buf)
            .map_err(|e| frame_err("reading version", e))?;
        let version = u16::from_le_bytes(u16_buf);
        if version != FRAME_FORMAT_VERSION {
            return Err(SchunkError::FrameFormatError(format!(
                "Unsupported frame version: expected {}, got {}",
                FRAME_FORMAT_VERSION, version
            )));
        }

        let mut u32_buf = [0u8; 4];
        reader
            .read_exact(&mut u32_buf)
            .map_err(|e| frame_err("reading config length", e))?;
        let config_len = u32::from_le_bytes(u32_buf) as usize;
        if config_len > MAX_CONFIG_LEN {
            return Err(SchunkError::FrameFormatError(format!(
                "config block of {} bytes is implausibly large",
                config_len
            )));
        }
        let mut config_json = vec![0u8; config_len];
        reader
            .read_exact(&mut config_json)
            .map_err(|e| frame_err("reading config", e))?;
        let config: SchunkConfig =
            serde_json::from_slice(&config_json).map_err(|e| frame_err("parsing config", e))?;

        let mut container =
            SuperChunk::new(config).map_err(|e| frame_err("invalid stored config", e))?;

        let mut u64_buf = [0u8; 8];
        reader
            .read_exact(&mut u64_buf)
            .map_err(|e| frame_err("reading chunk count", e))?;
        let nchunks = u64::from_le_bytes(u64_buf) as usize;

        // The table is read incrementally so a bogus count cannot force a huge
        // allocation before the stream runs dry.
        let mut lengths = Vec::new();
        for i in 0..nchunks {
            reader
                .read_exact(&mut u64_buf)
                .map_err(|e| frame_err(&format!("reading length of chunk {}", i), e))?;
            lengths.push(u64::from_le_bytes(u64_buf) as usize);
        }

        for (i, len) in lengths.into_iter().enumerate() {
            let mut chunk = Vec::new();
            reader
                .by_ref()
                .take(len as u64)
                .read_to_end(&mut chunk)
                .map_err(|e| frame_err(&format!("reading chunk {}", i), e))?;
            if chunk.len() != len {
                return Err(SchunkError::FrameFormatError(format!(
                    "chunk {} truncated: expected {} bytes, got {}",
                    i,
                    len,
                    chunk.len()
                )));
            }
            container
                .append_chunk(chunk)
                .map_err(|e| frame_err(&format!("chunk {}", i), e))?;
        }

        log::debug!(
            "loaded frame with {} chunks ({} compressed bytes)",
            container.nchunks(),
            container.stats().compressed_bytes
        );
        Ok(container)
    }

    /// Writes the container to a file at `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SchunkError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)
    }

    /// Loads a container previously written with [`save`](Self::save).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SchunkError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}
