//! This module provides a set of shared, low-level utility functions used
//! throughout the superchunk core.
//!
//! Its primary responsibilities include:
//! 1.  Converting typed slices into owned byte buffers.
//! 2.  Checking that a typed buffer matches a container's element size.

use crate::error::SchunkError;

//==================================================================================
// 1. Core Utility Functions
//==================================================================================

/// Converts a slice of primitives into an owned `Vec<u8>` in native byte order.
pub fn typed_slice_to_bytes<T: bytemuck::Pod>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

/// Verifies that `T` has the element width a container was configured with.
pub fn check_typesize<T>(typesize: usize) -> Result<(), SchunkError> {
    let got = std::mem::size_of::<T>();
    if got != typesize {
        return Err(SchunkError::TypeSizeMismatch {
            expected: typesize,
            got,
        });
    }
    Ok(())
}

//==================================================================================
// 2. Unit Tests
//==================================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_slice_to_bytes_is_native_endian() {
        let bytes = typed_slice_to_bytes(&[1.5f64, -2.25]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &1.5f64.to_ne_bytes());
        assert_eq!(&bytes[8..], &(-2.25f64).to_ne_bytes());
    }

    #[test]
    fn test_check_typesize() {
        assert!(check_typesize::<f64>(8).is_ok());
        assert!(matches!(
            check_typesize::<f32>(8),
            Err(SchunkError::TypeSizeMismatch { expected: 8, got: 4 })
        ));
    }
}
