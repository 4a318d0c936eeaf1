//! Float trait abstraction for f32/f64 support.
//!
//! Filter construction, the parameter store and the npy persistence layer are
//! generic over this trait, so one code path serves both machine precisions.

use ndarray_npy::{ReadableElement, WritableElement};
use num_traits::{Float, FromPrimitive, NumAssign};
use rustfft::FftNum;
use std::fmt::Debug;
use std::iter::Sum;

/// Floating point types usable for bowtie filters and network parameters.
///
/// Combines the bounds needed across the crate:
/// - Basic float operations (Float, NumAssign)
/// - FFT compatibility for the back-projection round trip (FftNum)
/// - Conversion from primitive types (FromPrimitive)
/// - `.npy` / `.npz` serialization (ReadableElement, WritableElement)
pub trait PsidoFloat:
    Float
    + FftNum
    + FromPrimitive
    + NumAssign
    + Sum
    + Debug
    + ReadableElement
    + WritableElement
    + Send
    + Sync
    + 'static
{
    /// The constant PI for this float type.
    const PI: Self;

    /// Create a value from an f64 constant.
    fn from_f64_c(val: f64) -> Self;

    /// Create a value from a usize constant.
    fn usize_as(val: usize) -> Self;

    /// Create a value from an isize constant.
    fn isize_as(val: isize) -> Self;
}

impl PsidoFloat for f32 {
    const PI: Self = std::f32::consts::PI;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val as f32
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f32
    }

    #[inline]
    fn isize_as(val: isize) -> Self {
        val as f32
    }
}

impl PsidoFloat for f64 {
    const PI: Self = std::f64::consts::PI;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f64
    }

    #[inline]
    fn isize_as(val: isize) -> Self {
        val as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use ndarray_npy::{read_npy, write_npy};

    /// Write a small block through the npy bounds and read it back.
    fn npy_round_trip<F: PsidoFloat>() -> (Array2<F>, Array2<F>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block.npy");
        let block = Array2::from_shape_fn((3, 2), |(r, c)| {
            F::isize_as(r as isize - 1) * F::PI + F::usize_as(c) / F::from_f64_c(3.0)
        });
        write_npy(&path, &block).unwrap();
        let read: Array2<F> = read_npy(&path).unwrap();
        (block, read)
    }

    #[test]
    fn test_f32_npy_round_trip() {
        let (written, read) = npy_round_trip::<f32>();
        assert_eq!(read, written);
        assert_eq!(read[[0, 0]], -std::f32::consts::PI);
        assert_eq!(read[[1, 1]], 1.0f32 / 3.0);
    }

    #[test]
    fn test_f64_npy_round_trip() {
        let (written, read) = npy_round_trip::<f64>();
        assert_eq!(read, written);
        assert_eq!(read[[2, 0]], std::f64::consts::PI);
    }

    #[test]
    fn test_npy_descriptor_tracks_precision() {
        // f32 blocks are stored as '<f4' and cannot be read back as f64.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrow.npy");
        write_npy(&path, &Array2::<f32>::zeros((2, 2))).unwrap();
        assert!(read_npy::<_, Array2<f64>>(&path).is_err());
        assert!(read_npy::<_, Array2<f32>>(&path).is_ok());
    }
}
