// In: src/report.rs

//! The reporting boundary: what a pipeline run hands back to its caller.
//! Formatting is left to the caller; everything here serializes to JSON.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::schunk::SchunkStats;

const MIB: f64 = 1024.0 * 1024.0;

/// Wall-clock time of one phase and the logical bytes it moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseTiming {
    #[serde(rename = "elapsed_secs", serialize_with = "duration_as_secs")]
    pub elapsed: Duration,
    pub bytes: u64,
}

impl PhaseTiming {
    pub fn new(elapsed: Duration, bytes: u64) -> Self {
        Self { elapsed, bytes }
    }

    /// Throughput in MiB/s, or 0 when the phase took no measurable time.
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes as f64 / MIB / secs
        } else {
            0.0
        }
    }
}

fn duration_as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Everything a completed run exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineReport {
    pub x_stats: SchunkStats,
    pub y_stats: SchunkStats,
    pub generation: PhaseTiming,
    pub transform: PhaseTiming,
    pub scan: PhaseTiming,
    pub roots: Vec<f64>,
    pub skipped_chunks: Vec<usize>,
}
