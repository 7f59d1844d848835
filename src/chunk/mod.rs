//! A single compressed chunk: its byte layout and the codec that produces it.

pub mod compressor;
pub mod format;

pub use compressor::ChunkCodec;
pub use format::{BlockEntry, ChunkHeader};
