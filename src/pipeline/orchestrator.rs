// In: src/pipeline/orchestrator.rs

//! The generate / transform / scan driver.
//!
//! `VectorPipeline` fills an x container chunk by chunk, maps it element-wise into
//! a y container, then scans both for sign changes. Every phase works one chunk at
//! a time through pooled scratch buffers, so memory stays proportional to the chunk
//! size no matter how many chunks are processed.

use std::time::Instant;

use rayon::prelude::*;

use crate::config::{PipelineConfig, TransformMode};
use crate::error::SchunkError;
use crate::pipeline::generator::{ChunkGenerator, LinearRamp};
use crate::pipeline::scanner::{scan_containers, ScanOutcome};
use crate::pipeline::transform::{CubicRoots, ElementTransform};
use crate::report::{PhaseTiming, PipelineReport};
use crate::schunk::SuperChunk;
use crate::scratch::ScratchPool;

pub struct VectorPipeline {
    config: PipelineConfig,
    generator: Box<dyn ChunkGenerator>,
    transform: Box<dyn ElementTransform>,
    scratch: ScratchPool<f64>,
    seed: Option<f64>,
}

impl std::fmt::Debug for VectorPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorPipeline")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl VectorPipeline {
    /// Builds a pipeline with the linear ramp generator and the cubic transform
    /// described by `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, SchunkError> {
        config.validate()?;
        let generator = LinearRamp::new(config.span, config.total_len());
        let transform = CubicRoots::new(config.roots);
        // Two buffers for the scan plus two per worker in chunk-parallel mode.
        let max_retained = 2 * config.schunk.nthreads + 2;
        let scratch = ScratchPool::new(config.schunk.chunk_len, max_retained);
        Ok(Self {
            config,
            generator: Box::new(generator),
            transform: Box::new(transform),
            scratch,
            seed: None,
        })
    }

    pub fn with_generator(mut self, generator: impl ChunkGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    pub fn with_transform(mut self, transform: impl ElementTransform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Value the first y sample is compared against. Defaults to the first y sample.
    pub fn with_seed(mut self, seed: f64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn chunk_bytes(&self) -> u64 {
        self.config.schunk.chunk_nbytes() as u64
    }

    //==============================================================================
    // Phases
    //==============================================================================

    /// Generates `nchunks` chunks into a new x container.
    pub fn generate(&self) -> Result<(SuperChunk, PhaseTiming), SchunkError> {
        let start = Instant::now();
        let mut x = SuperChunk::new(self.config.schunk.clone())?;
        let mut buf = self.scratch.acquire();

        for index in 0..self.config.nchunks {
            self.generator.fill(index, &mut buf);
            x.append(&buf[..])?;
        }

        let timing = PhaseTiming::new(
            start.elapsed(),
            self.chunk_bytes() * self.config.nchunks as u64,
        );
        log::info!(
            "generated {} chunks of x in {:.3?} ({:.1} MiB/s)",
            x.nchunks(),
            timing.elapsed,
            timing.throughput_mib_s()
        );
        Ok((x, timing))
    }

    /// Maps every chunk of `x` through the transform into a new y container.
    pub fn transform(&self, x: &SuperChunk) -> Result<(SuperChunk, PhaseTiming), SchunkError> {
        let start = Instant::now();
        let mut y = SuperChunk::new(self.config.schunk.clone())?;
        if x.chunk_len() != y.chunk_len() {
            return Err(SchunkError::SizeMismatch {
                expected: y.chunk_len(),
                got: x.chunk_len(),
            });
        }

        match self.config.transform_mode {
            TransformMode::Sequential => self.transform_sequential(x, &mut y)?,
            TransformMode::ChunkParallel => self.transform_parallel(x, &mut y)?,
        }

        // x is read and y is written.
        let timing = PhaseTiming::new(start.elapsed(), 2 * self.chunk_bytes() * x.nchunks() as u64);
        log::info!(
            "transformed {} chunks in {:.3?} ({:.1} MiB/s, {:?})",
            y.nchunks(),
            timing.elapsed,
            timing.throughput_mib_s(),
            self.config.transform_mode
        );
        Ok((y, timing))
    }

    fn transform_sequential(&self, x: &SuperChunk, y: &mut SuperChunk) -> Result<(), SchunkError> {
        let mut xbuf = self.scratch.acquire();
        let mut ybuf = self.scratch.acquire();
        for index in 0..x.nchunks() {
            x.decompress_chunk(index, &mut xbuf)?;
            self.transform.apply_slice(&xbuf, &mut ybuf);
            y.append(&ybuf[..])?;
        }
        Ok(())
    }

    /// Transforms batches of chunks on the container pool, then appends the
    /// compressed results strictly in index order.
    fn transform_parallel(&self, x: &SuperChunk, y: &mut SuperChunk) -> Result<(), SchunkError> {
        let batch = self.config.schunk.nthreads.max(1);
        let indices: Vec<usize> = (0..x.nchunks()).collect();

        for window in indices.chunks(batch) {
            let target: &SuperChunk = y;
            let encode = |&index: &usize| -> Result<Vec<u8>, SchunkError> {
                let mut xbuf = self.scratch.acquire();
                let mut ybuf = self.scratch.acquire();
                x.decompress_chunk(index, &mut xbuf)?;
                self.transform.apply_slice(&xbuf, &mut ybuf);
                target.compress_chunk(bytemuck::cast_slice(&ybuf[..]))
            };

            let compressed: Vec<Vec<u8>> = match target.thread_pool() {
                Some(pool) => pool.install(|| {
                    window
                        .par_iter()
                        .map(encode)
                        .collect::<Result<Vec<_>, SchunkError>>()
                })?,
                None => window
                    .iter()
                    .map(encode)
                    .collect::<Result<Vec<_>, SchunkError>>()?,
            };

            for chunk in compressed {
                y.append_chunk(chunk)?;
            }
        }
        Ok(())
    }

    /// Scans `x` and `y` for sign changes of y.
    pub fn scan(&self, x: &SuperChunk, y: &SuperChunk) -> Result<(ScanOutcome, PhaseTiming), SchunkError> {
        let start = Instant::now();
        let outcome = scan_containers(x, y, self.seed, self.config.decode_policy, &self.scratch)?;
        let timing = PhaseTiming::new(start.elapsed(), 2 * self.chunk_bytes() * x.nchunks() as u64);

        if !outcome.skipped_chunks.is_empty() {
            log::warn!(
                "{} chunk(s) skipped during the scan; roots near them may be missing",
                outcome.skipped_chunks.len()
            );
        }
        log::info!(
            "found {} root(s) in {:.3?} ({:.1} MiB/s)",
            outcome.roots.len(),
            timing.elapsed,
            timing.throughput_mib_s()
        );
        Ok((outcome, timing))
    }

    /// Runs all three phases and collects the report.
    pub fn run(&self) -> Result<PipelineReport, SchunkError> {
        let (x, generation) = self.generate()?;
        let (y, transform) = self.transform(&x)?;
        let (outcome, scan) = self.scan(&x, &y)?;

        Ok(PipelineReport {
            x_stats: x.stats(),
            y_stats: y.stats(),
            generation,
            transform,
            scan,
            roots: outcome.roots,
            skipped_chunks: outcome.skipped_chunks,
        })
    }
}
