//! This file is the root of the `superchunk` Rust crate.
//!
//! `superchunk` is an append-only container of fixed-size compressed chunks
//! (filters + block codec, block-parallel on a rayon pool) together with the
//! generate / transform / scan pipeline that locates the roots of a function
//! sampled into such containers.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library.
//! 2.  Re-exporting the types most callers need.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod chunk;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod kernels;
pub mod pipeline;
pub mod report;
pub mod schunk;
pub mod scratch;

pub mod utils;

//==================================================================================
// 2. Public Re-exports
//==================================================================================
pub use config::{CodecKind, DecodePolicy, FilterKind, PipelineConfig, SchunkConfig, TransformMode};
pub use error::SchunkError;
pub use pipeline::{RootScanner, ScanOutcome, VectorPipeline};
pub use report::{PhaseTiming, PipelineReport};
pub use schunk::{SchunkStats, SuperChunk};
