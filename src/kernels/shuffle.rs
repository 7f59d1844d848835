//! This module contains the pure, stateless kernel for performing byte-shuffling
//! on streams of fixed-width elements.
//!
//! This is a Byte Distribution transform. It reorganizes a row-oriented byte
//! stream into a "byte-plane" layout: all first bytes, then all second bytes, and
//! so on. For slowly varying floats the high planes (sign, exponent, top of the
//! mantissa) become long runs that the block codec then compresses well.
//! The element width is a runtime value because containers store raw bytes.

use crate::error::SchunkError;

//==================================================================================
// 1. Core Logic (The "Engine")
//==================================================================================

fn check_len(len: usize, typesize: usize) -> Result<(), SchunkError> {
    if typesize == 0 || len % typesize != 0 {
        return Err(SchunkError::BufferMismatch(len, typesize));
    }
    Ok(())
}

/// Performs byte-shuffling on a byte slice, writing to an output buffer.
fn shuffle_slice(input_bytes: &[u8], typesize: usize, output_buf: &mut Vec<u8>) {
    let num_elements = input_bytes.len() / typesize;
    output_buf.clear();
    output_buf.resize(input_bytes.len(), 0);

    for (j, element) in input_bytes.chunks_exact(typesize).enumerate() {
        for (i, &byte) in element.iter().enumerate() {
            output_buf[i * num_elements + j] = byte;
        }
    }
}

/// Performs byte-unshuffling on a byte slice, writing to an output buffer.
fn unshuffle_slice(input_bytes: &[u8], typesize: usize, output_buf: &mut Vec<u8>) {
    let num_elements = input_bytes.len() / typesize;
    output_buf.clear();
    output_buf.resize(input_bytes.len(), 0);

    for (j, element) in output_buf.chunks_exact_mut(typesize).enumerate() {
        for (i, byte) in element.iter_mut().enumerate() {
            *byte = input_bytes[i * num_elements + j];
        }
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// The public-facing encode function for this module.
pub fn encode(
    input_bytes: &[u8],
    typesize: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), SchunkError> {
    check_len(input_bytes.len(), typesize)?;
    if typesize == 1 {
        output_buf.clear();
        output_buf.extend_from_slice(input_bytes);
        return Ok(());
    }
    shuffle_slice(input_bytes, typesize, output_buf);
    Ok(())
}

/// The public-facing decode function for this module.
pub fn decode(
    input_bytes: &[u8],
    typesize: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), SchunkError> {
    check_len(input_bytes.len(), typesize)?;
    if typesize == 1 {
        output_buf.clear();
        output_buf.extend_from_slice(input_bytes);
        return Ok(());
    }
    unshuffle_slice(input_bytes, typesize, output_buf);
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::typed_slice_to_bytes;

    #[test]
    fn test_shuffle_roundtrip_u16() {
        let original: Vec<u16> = vec![0x0102, 0x0304, 0x0506];
        let original_as_bytes = typed_slice_to_bytes(&original);

        let mut encoded_bytes = Vec::new();
        encode(&original_as_bytes, 2, &mut encoded_bytes).unwrap();

        if cfg!(target_endian = "little") {
            let expected_encoded: Vec<u8> = vec![0x02, 0x04, 0x06, 0x01, 0x03, 0x05];
            assert_eq!(encoded_bytes, expected_encoded);
        }

        let mut decoded_bytes = Vec::new();
        decode(&encoded_bytes, 2, &mut decoded_bytes).unwrap();
        assert_eq!(decoded_bytes, original_as_bytes);
    }

    #[test]
    fn test_shuffle_f64_groups_high_bytes() {
        let original: Vec<f64> = vec![1.0, 1.0000001, 1.0000002, 1.0000003];
        let original_as_bytes = typed_slice_to_bytes(&original);

        let mut encoded_bytes = Vec::new();
        encode(&original_as_bytes, 8, &mut encoded_bytes).unwrap();

        // The top byte plane is the sign+exponent byte, identical for all values.
        if cfg!(target_endian = "little") {
            assert!(encoded_bytes[28..32].iter().all(|&b| b == 0x3f));
        }

        let mut decoded_bytes = Vec::new();
        decode(&encoded_bytes, 8, &mut decoded_bytes).unwrap();
        assert_eq!(decoded_bytes, original_as_bytes);
    }

    #[test]
    fn test_shuffle_single_byte_type_is_noop() {
        let original: Vec<u8> = vec![1, 2, 3, 4, 5];

        let mut encoded_bytes = Vec::new();
        encode(&original, 1, &mut encoded_bytes).unwrap();
        assert_eq!(encoded_bytes, original);
    }

    #[test]
    fn test_shuffle_odd_typesize() {
        let original: Vec<u8> = (0..15).collect();
        let mut encoded_bytes = Vec::new();
        encode(&original, 3, &mut encoded_bytes).unwrap();
        assert_eq!(&encoded_bytes[..5], &[0, 3, 6, 9, 12]);

        let mut decoded_bytes = Vec::new();
        decode(&encoded_bytes, 3, &mut decoded_bytes).unwrap();
        assert_eq!(decoded_bytes, original);
    }

    #[test]
    fn test_decode_invalid_length_error() {
        let invalid_bytes = vec![1, 2, 3, 4, 5, 6, 7];
        let mut decoded_bytes = Vec::new();
        let result = decode(&invalid_bytes, 2, &mut decoded_bytes);
        assert!(matches!(result, Err(SchunkError::BufferMismatch(7, 2))));
    }
}
