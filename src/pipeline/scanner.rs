// In: src/pipeline/scanner.rs

//! Sign-change root detection across chunk boundaries.
//!
//! The scanner walks paired x/y chunks in index order and reports `x[i]` whenever
//! the sign of `y[i]` differs from the sign of the previous sample. The previous
//! sample of the first element of a chunk is the last sample of the chunk before
//! it, so crossings that land exactly on a chunk boundary are still found, once.
//!
//! Zero is its own sign class. A crossing that passes through an exact zero would
//! otherwise be reported twice (into the zero and out of it), so a report is
//! suppressed when the immediately preceding sample of the same chunk reported.
//! This is a tie-break heuristic: it can miss or double count roots near
//! tangential crossings, and is kept as-is.

use crate::config::DecodePolicy;
use crate::error::SchunkError;
use crate::schunk::SuperChunk;
use crate::scratch::ScratchPool;

/// The three sign classes a sample can fall into. NaN counts as `Zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    #[inline]
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            Sign::Positive
        } else if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Zero
        }
    }
}

/// State carried from one chunk to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanState {
    /// Last y sample seen. `None` until seeded or until the first chunk arrives.
    pub previous: Option<f64>,
    /// Index of the last reported root within the chunk being scanned. Always
    /// `None` between chunks.
    pub last_root: Option<usize>,
}

/// Incremental root finder fed one chunk at a time.
#[derive(Debug, Clone, Default)]
pub struct RootScanner {
    state: ScanState,
    roots: Vec<f64>,
}

impl RootScanner {
    /// A scanner that seeds itself from the first y sample it sees.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scanner whose first sample is compared against `seed`.
    pub fn with_seed(seed: f64) -> Self {
        Self {
            state: ScanState {
                previous: Some(seed),
                last_root: None,
            },
            roots: Vec::new(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn roots(&self) -> &[f64] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<f64> {
        self.roots
    }

    /// Scans one pair of chunks and returns the number of roots it reported.
    pub fn scan_chunk(&mut self, x: &[f64], y: &[f64]) -> Result<usize, SchunkError> {
        if x.len() != y.len() {
            return Err(SchunkError::SizeMismatch {
                expected: x.len(),
                got: y.len(),
            });
        }
        let Some(&first) = y.first() else {
            return Ok(0);
        };

        let mut previous = self.state.previous.unwrap_or(first);
        let mut last_root: Option<usize> = None;
        let before = self.roots.len();

        for (i, (&xi, &yi)) in x.iter().zip(y).enumerate() {
            if Sign::of(yi) != Sign::of(previous) {
                let just_reported = i > 0 && last_root == Some(i - 1);
                if !just_reported {
                    self.roots.push(xi);
                    last_root = Some(i);
                }
            }
            previous = yi;
        }

        // Suppression never reaches across a chunk boundary.
        self.state = ScanState {
            previous: Some(previous),
            last_root: None,
        };
        Ok(self.roots.len() - before)
    }
}

/// Result of scanning a pair of containers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub roots: Vec<f64>,
    /// Chunks dropped under `DecodePolicy::SkipChunk`.
    pub skipped_chunks: Vec<usize>,
    pub chunks_scanned: usize,
}

/// Scans paired x/y containers chunk by chunk, decoding into pooled buffers.
///
/// Under `DecodePolicy::SkipChunk` a chunk that fails to decode is logged and
/// skipped; the carried value is left untouched, so the next chunk is compared
/// against the last sample of the chunk before the skipped one.
pub fn scan_containers(
    x: &SuperChunk,
    y: &SuperChunk,
    seed: Option<f64>,
    policy: DecodePolicy,
    scratch: &ScratchPool<f64>,
) -> Result<ScanOutcome, SchunkError> {
    if x.nchunks() != y.nchunks() {
        return Err(SchunkError::SizeMismatch {
            expected: x.nchunks(),
            got: y.nchunks(),
        });
    }
    if x.chunk_len() != y.chunk_len() || scratch.capacity() < x.chunk_len() {
        return Err(SchunkError::SizeMismatch {
            expected: x.chunk_len(),
            got: y.chunk_len().min(scratch.capacity()),
        });
    }

    let mut scanner = match seed {
        Some(seed) => RootScanner::with_seed(seed),
        None => RootScanner::new(),
    };
    let mut outcome = ScanOutcome::default();
    let mut xbuf = scratch.acquire();
    let mut ybuf = scratch.acquire();
    let n = x.chunk_len();

    for index in 0..x.nchunks() {
        let decoded = y
            .decompress_chunk(index, &mut ybuf[..n])
            .and_then(|_| x.decompress_chunk(index, &mut xbuf[..n]));

        match decoded {
            Ok(_) => {}
            Err(SchunkError::DecodeFailed(reason)) if policy == DecodePolicy::SkipChunk => {
                log::warn!("skipping chunk {} during root scan: {}", index, reason);
                outcome.skipped_chunks.push(index);
                continue;
            }
            Err(e) => return Err(e),
        }

        let found = scanner.scan_chunk(&xbuf[..n], &ybuf[..n])?;
        if found > 0 {
            log::debug!("chunk {}: {} root(s)", index, found);
        }
        outcome.chunks_scanned += 1;
    }

    outcome.roots = scanner.into_roots();
    Ok(outcome)
}
