//! Deterministic sources for the input (x) container.

/// Produces the samples of one chunk from its position in the logical array.
///
/// Implementations must be pure functions of `(chunk_index, out.len())` so that
/// chunks can be generated in any order, or in parallel, with identical results.
pub trait ChunkGenerator: Send + Sync {
    fn fill(&self, chunk_index: usize, out: &mut [f64]);
}

/// `value = scale * global_index`, an evenly spaced ramp starting at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRamp {
    pub scale: f64,
}

impl LinearRamp {
    /// A ramp of `total_len` samples covering `[0, span)`.
    pub fn new(span: f64, total_len: usize) -> Self {
        let scale = if total_len == 0 {
            0.0
        } else {
            span / total_len as f64
        };
        Self { scale }
    }
}

impl ChunkGenerator for LinearRamp {
    fn fill(&self, chunk_index: usize, out: &mut [f64]) {
        let base = chunk_index * out.len();
        for (j, slot) in out.iter_mut().enumerate() {
            *slot = self.scale * (base + j) as f64;
        }
    }
}

impl<F> ChunkGenerator for F
where
    F: Fn(usize, &mut [f64]) + Send + Sync,
{
    fn fill(&self, chunk_index: usize, out: &mut [f64]) {
        self(chunk_index, out)
    }
}
