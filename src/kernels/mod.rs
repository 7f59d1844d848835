//! This module declares the collection of pure, stateless byte kernels.
//!
//! Kernels know nothing about chunks or containers: each one maps an input byte
//! slice to an output buffer. The `filter` and `codec` modules wrap them behind
//! the `Filter` and `Codec` traits that the chunk codec drives.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Value Reduction (lossy)
pub mod trunc_prec;

/// Value Reduction
pub mod xor_delta;

/// Byte Distribution
pub mod shuffle;

/// Final Stage: block codecs
pub mod lz4;
pub mod zstd;
