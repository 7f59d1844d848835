// In: src/error.rs

//! This module defines the single, unified error type for the entire superchunk library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchunkError {
    // =========================================================================
    // === High-Level, Semantic Errors (Container and pipeline contract)
    // =========================================================================
    /// Invalid container or pipeline configuration. Fatal to construction.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A buffer's logical element count does not match the expected count.
    #[error("Size mismatch: expected {expected} elements, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    /// A typed API was called with an element type of the wrong width.
    #[error("Element size mismatch: container holds {expected}-byte elements, got {got}-byte elements")]
    TypeSizeMismatch { expected: usize, got: usize },

    #[error("Chunk index {index} out of range (container holds {count} chunks)")]
    InvalidIndex { index: usize, count: usize },

    #[error("Output buffer too small: need {needed} elements, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// The codec or chunk parser detected corruption or truncation.
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    #[error("Frame serialization/deserialization failed: {0}")]
    FrameFormatError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, raised when a report is serialized.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Low-Level Kernel Errors
    // =========================================================================
    #[error("Buffer length mismatch: {0} bytes is not a multiple of element size {1}")]
    BufferMismatch(usize, usize),

    #[error("Codec operation failed: {0}")]
    Codec(String),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<rayon::ThreadPoolBuildError> for SchunkError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SchunkError::Configuration(format!("failed to build thread pool: {}", err))
    }
}
