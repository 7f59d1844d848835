//! This module contains the pure, stateless kernels for performing
//! XOR delta encoding and decoding.
//!
//! This is a Value Reduction transform. Each element is XORed with the element
//! before it, which leaves only the flipped bits of slowly changing data. Working
//! byte-wise against the byte `typesize` positions earlier is the same as an
//! element-wise XOR for every element width, so no typed cast is needed.

use crate::error::SchunkError;

/// Performs XOR delta encoding **in-place** on a mutable byte slice.
fn xor_delta_slice_inplace(data: &mut [u8], typesize: usize) {
    if data.len() <= typesize {
        return;
    }
    // Iterate backwards for encoding to use original values for calculation.
    for i in (typesize..data.len()).rev() {
        data[i] ^= data[i - typesize];
    }
}

/// Reconstructs the original data from an XOR delta stream **in-place**.
fn xor_undelta_slice_inplace(data: &mut [u8], typesize: usize) {
    if data.len() <= typesize {
        return;
    }
    // Iterate forwards to use the newly-decoded values for subsequent XORs.
    for i in typesize..data.len() {
        data[i] ^= data[i - typesize];
    }
}

fn check_len(len: usize, typesize: usize) -> Result<(), SchunkError> {
    if typesize == 0 || len % typesize != 0 {
        return Err(SchunkError::BufferMismatch(len, typesize));
    }
    Ok(())
}

/// The public-facing encode function for this module.
pub fn encode(
    input_bytes: &[u8],
    typesize: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), SchunkError> {
    check_len(input_bytes.len(), typesize)?;
    output_buf.clear();
    output_buf.extend_from_slice(input_bytes);
    xor_delta_slice_inplace(output_buf, typesize);
    Ok(())
}

/// The public-facing decode function for this module.
pub fn decode(
    input_bytes: &[u8],
    typesize: usize,
    output_buf: &mut Vec<u8>,
) -> Result<(), SchunkError> {
    check_len(input_bytes.len(), typesize)?;
    output_buf.clear();
    output_buf.extend_from_slice(input_bytes);
    xor_undelta_slice_inplace(output_buf, typesize);
    Ok(())
}
