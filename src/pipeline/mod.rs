//! The root-finding pipeline built on top of the super-chunk container.
//!
//! `generator` produces the x samples, `transform` maps x to y, `scanner` looks
//! for sign changes in y, and `orchestrator` drives the three phases.

pub mod generator;
pub mod orchestrator;
pub mod scanner;
pub mod transform;

pub use generator::{ChunkGenerator, LinearRamp};
pub use orchestrator::VectorPipeline;
pub use scanner::{scan_containers, RootScanner, ScanOutcome, ScanState, Sign};
pub use transform::{CubicRoots, ElementTransform};
