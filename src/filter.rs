// In: src/filter.rs

//! The filter stage: element-wise transforms applied around compression.
//!
//! Each configured `FilterKind` becomes a `Filter` trait object. A
//! `FilterPipeline` runs them in configured order before compression and undoes
//! them in reverse order after decompression, swapping between two buffers the
//! same way the linear executor does. Filters are deterministic and driven only
//! by their configuration.

use std::fmt::Debug;

use crate::config::FilterKind;
use crate::error::SchunkError;
use crate::kernels;

/// A forward/backward byte transform over elements of a fixed width.
pub trait Filter: Send + Sync + Debug {
    fn kind(&self) -> FilterKind;

    /// Forward transform, run before compression.
    fn apply(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError>;

    /// Backward transform, run after decompression.
    fn invert(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError>;

    /// True if `invert(apply(x))` may differ from `x`.
    fn is_lossy(&self) -> bool {
        false
    }
}

/// Builds the filter object for one configured step.
pub fn filter_for(kind: FilterKind, typesize: usize) -> Box<dyn Filter> {
    match kind {
        FilterKind::Identity => Box::new(IdentityFilter),
        FilterKind::TruncPrec { bits } => Box::new(TruncPrecFilter { typesize, bits }),
        FilterKind::Shuffle => Box::new(ShuffleFilter { typesize }),
        FilterKind::Delta => Box::new(DeltaFilter { typesize }),
    }
}

//==================================================================================
// 1. Filters
//==================================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter;

impl Filter for IdentityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Identity
    }

    fn apply(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        output.clear();
        output.extend_from_slice(input);
        Ok(())
    }

    fn invert(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        self.apply(input, output)
    }
}

/// Keeps `bits` significant mantissa bits. Inversion is the identity.
#[derive(Debug, Clone, Copy)]
pub struct TruncPrecFilter {
    pub typesize: usize,
    pub bits: u8,
}

impl Filter for TruncPrecFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::TruncPrec { bits: self.bits }
    }

    fn apply(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        kernels::trunc_prec::encode(input, self.typesize, self.bits, output)
    }

    fn invert(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        output.clear();
        output.extend_from_slice(input);
        Ok(())
    }

    fn is_lossy(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ShuffleFilter {
    pub typesize: usize,
}

impl Filter for ShuffleFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Shuffle
    }

    fn apply(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        kernels::shuffle::encode(input, self.typesize, output)
    }

    fn invert(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        kernels::shuffle::decode(input, self.typesize, output)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeltaFilter {
    pub typesize: usize,
}

impl Filter for DeltaFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Delta
    }

    fn apply(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        kernels::xor_delta::encode(input, self.typesize, output)
    }

    fn invert(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), SchunkError> {
        kernels::xor_delta::decode(input, self.typesize, output)
    }
}

//==================================================================================
// 2. Pipeline
//==================================================================================

/// An ordered, immutable sequence of filters.
#[derive(Debug)]
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new(kinds: &[FilterKind], typesize: usize) -> Self {
        Self {
            filters: kinds.iter().map(|&k| filter_for(k, typesize)).collect(),
        }
    }

    pub fn kinds(&self) -> Vec<FilterKind> {
        self.filters.iter().map(|f| f.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn is_lossy(&self) -> bool {
        self.filters.iter().any(|f| f.is_lossy())
    }

    /// Runs every filter forward, in order.
    pub fn apply(&self, block: &[u8]) -> Result<Vec<u8>, SchunkError> {
        let mut buffer_a = block.to_vec();
        let mut buffer_b = Vec::with_capacity(buffer_a.len());

        for filter in &self.filters {
            filter.apply(&buffer_a, &mut buffer_b)?;
            std::mem::swap(&mut buffer_a, &mut buffer_b);
        }
        Ok(buffer_a)
    }

    /// Runs every filter backward, in reverse order.
    pub fn invert(&self, block: Vec<u8>) -> Result<Vec<u8>, SchunkError> {
        let mut buffer_a = block;
        let mut buffer_b = Vec::with_capacity(buffer_a.len());

        for filter in self.filters.iter().rev() {
            filter.invert(&buffer_a, &mut buffer_b)?;
            std::mem::swap(&mut buffer_a, &mut buffer_b);
        }
        Ok(buffer_a)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::typed_slice_to_bytes;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.001 + 0.123456789).collect()
    }

    #[test]
    fn test_lossless_pipeline_roundtrip() {
        let bytes = typed_slice_to_bytes(&ramp(256));
        let pipeline = FilterPipeline::new(
            &[FilterKind::Delta, FilterKind::Shuffle, FilterKind::Identity],
            8,
        );
        assert!(!pipeline.is_lossy());

        let filtered = pipeline.apply(&bytes).unwrap();
        assert_ne!(filtered, bytes);
        assert_eq!(pipeline.invert(filtered).unwrap(), bytes);
    }

    #[test]
    fn test_invert_runs_in_reverse_order() {
        // shuffle(delta(x)) != delta(shuffle(x)), so a wrong order would not restore x.
        let bytes = typed_slice_to_bytes(&ramp(64));
        let pipeline = FilterPipeline::new(&[FilterKind::Shuffle, FilterKind::Delta], 8);
        let filtered = pipeline.apply(&bytes).unwrap();
        assert_eq!(pipeline.invert(filtered).unwrap(), bytes);
    }

    #[test]
    fn test_trunc_prec_pipeline_is_lossy_but_bounded() {
        let values = ramp(128);
        let bytes = typed_slice_to_bytes(&values);
        let pipeline = FilterPipeline::new(
            &[FilterKind::TruncPrec { bits: 23 }, FilterKind::Shuffle],
            8,
        );
        assert!(pipeline.is_lossy());

        let restored = pipeline.invert(pipeline.apply(&bytes).unwrap()).unwrap();
        let restored: Vec<f64> = restored
            .chunks_exact(8)
            .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        for (orig, back) in values.iter().zip(&restored) {
            assert!((orig - back).abs() <= orig.abs() * 2f64.powi(-23));
        }
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = FilterPipeline::new(&[], 8);
        assert!(pipeline.is_empty());
        let bytes = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(pipeline.apply(&bytes).unwrap(), bytes);
        assert_eq!(pipeline.invert(bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn test_kinds_reflect_configuration() {
        let kinds = vec![FilterKind::TruncPrec { bits: 12 }, FilterKind::Delta];
        assert_eq!(FilterPipeline::new(&kinds, 8).kinds(), kinds);
    }
}
