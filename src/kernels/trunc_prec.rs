//! This module contains the pure, stateless kernel for precision truncation of
//! IEEE 754 floats.
//!
//! This is a lossy Value Reduction transform. It keeps the `bits` most significant
//! mantissa bits of every element and zeroes the rest, which rounds each value
//! toward zero and turns the low mantissa bytes into constant runs. The absolute
//! error is below `|x| * 2^-bits` for every normal finite input. There is no
//! decode: the discarded bits are gone.

use crate::error::SchunkError;

/// Mantissa width of an `f32`.
pub const F32_MANTISSA_BITS: u8 = 23;
/// Mantissa width of an `f64`.
pub const F64_MANTISSA_BITS: u8 = 52;

const F32_EXP_MASK: u32 = 0x7F80_0000;
const F64_EXP_MASK: u64 = 0x7FF0_0000_0000_0000;

//==================================================================================
// 1. Core Logic
//==================================================================================

fn truncate_f64_inplace(data: &mut [u8], bits: u8) {
    if bits >= F64_MANTISSA_BITS {
        return;
    }
    let mask = !0u64 << (F64_MANTISSA_BITS - bits);
    for element in data.chunks_exact_mut(8) {
        let mut word = [0u8; 8];
        word.copy_from_slice(element);
        let value = u64::from_ne_bytes(word);
        // NaN payloads and infinities pass through untouched.
        if value & F64_EXP_MASK == F64_EXP_MASK {
            continue;
        }
        element.copy_from_slice(&(value & mask).to_ne_bytes());
    }
}

fn truncate_f32_inplace(data: &mut [u8], bits: u8) {
    if bits >= F32_MANTISSA_BITS {
        return;
    }
    let mask = !0u32 << (F32_MANTISSA_BITS - bits);
    for element in data.chunks_exact_mut(4) {
        let mut word = [0u8; 4];
        word.copy_from_slice(element);
        let value = u32::from_ne_bytes(word);
        if value & F32_EXP_MASK == F32_EXP_MASK {
            continue;
        }
        element.copy_from_slice(&(value & mask).to_ne_bytes());
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Truncates every float in `input_bytes` to `bits` significant mantissa bits.
pub fn encode(
    input_bytes: &[u8],
    typesize: usize,
    bits: u8,
    output_buf: &mut Vec<u8>,
) -> Result<(), SchunkError> {
    if typesize == 0 || input_bytes.len() % typesize != 0 {
        return Err(SchunkError::BufferMismatch(input_bytes.len(), typesize));
    }
    output_buf.clear();
    output_buf.extend_from_slice(input_bytes);
    match typesize {
        8 => truncate_f64_inplace(output_buf, bits),
        4 => truncate_f32_inplace(output_buf, bits),
        other => {
            return Err(SchunkError::Configuration(format!(
                "precision truncation needs 4- or 8-byte floats, got typesize {}",
                other
            )))
        }
    }
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::typed_slice_to_bytes;
    use proptest::prelude::*;

    fn truncate_f64s(values: &[f64], bits: u8) -> Vec<f64> {
        let mut out = Vec::new();
        encode(&typed_slice_to_bytes(values), 8, bits, &mut out).unwrap();
        out.chunks_exact(8)
            .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn test_truncation_to_float_precision() {
        let values = [std::f64::consts::PI, -std::f64::consts::E, 0.1];
        let truncated = truncate_f64s(&values, 23);

        for (orig, trunc) in values.iter().zip(&truncated) {
            assert!(trunc.abs() <= orig.abs(), "truncation rounds toward zero");
            assert!((orig - trunc).abs() <= orig.abs() * 2f64.powi(-23));
            assert_eq!(trunc.to_bits() & ((1u64 << 29) - 1), 0);
        }
    }

    #[test]
    fn test_full_precision_is_noop() {
        let values = [1.0 / 3.0, 1e-300, -7.25];
        assert_eq!(truncate_f64s(&values, 52), values.to_vec());
        assert_eq!(truncate_f64s(&values, 60), values.to_vec());
    }

    #[test]
    fn test_exact_values_survive() {
        let values = [0.0, -0.0, 1.0, 0.5, 1024.0, -2.0];
        let truncated = truncate_f64s(&values, 1);
        for (orig, trunc) in values.iter().zip(&truncated) {
            assert_eq!(orig.to_bits(), trunc.to_bits());
        }
    }

    #[test]
    fn test_non_finite_values_pass_through() {
        let values = [f64::INFINITY, f64::NEG_INFINITY];
        assert_eq!(truncate_f64s(&values, 4), values.to_vec());
        assert!(truncate_f64s(&[f64::NAN], 4)[0].is_nan());
    }

    #[test]
    fn test_truncation_f32() {
        let values: Vec<f32> = vec![std::f32::consts::PI, 123.456];
        let mut out = Vec::new();
        encode(&typed_slice_to_bytes(&values), 4, 10, &mut out).unwrap();
        for (chunk, orig) in out.chunks_exact(4).zip(&values) {
            let trunc = f32::from_ne_bytes(chunk.try_into().unwrap());
            assert!((orig - trunc).abs() <= orig.abs() * 2f32.powi(-10));
            assert_eq!(trunc.to_bits() & ((1u32 << 13) - 1), 0);
        }
    }

    #[test]
    fn test_unsupported_typesize() {
        let mut out = Vec::new();
        assert!(matches!(
            encode(&[0u8; 4], 2, 8, &mut out),
            Err(SchunkError::Configuration(_))
        ));
        assert!(matches!(
            encode(&[0u8; 7], 8, 8, &mut out),
            Err(SchunkError::BufferMismatch(7, 8))
        ));
    }

    proptest! {
        #[test]
        fn prop_truncation_error_bound(
            value in prop_oneof![1e-300f64..1e300, -1e300f64..-1e-300],
            bits in 1u8..52,
        ) {
            let trunc = truncate_f64s(&[value], bits)[0];
            prop_assert!((value - trunc).abs() <= value.abs() * 2f64.powi(-(bits as i32)));
            prop_assert_eq!(value.is_sign_negative(), trunc.is_sign_negative());
        }
    }
}
