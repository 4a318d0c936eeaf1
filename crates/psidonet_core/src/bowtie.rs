//! Bowtie responses: the tomographic normal operator seen through a wavelet
//! basis.
//!
//! A unit coefficient is placed in one source subband, synthesized to image
//! space, forward- then back-projected, and decomposed again. The resulting
//! coefficients, one block per target subband, show the characteristic
//! bowtie pattern of the back-projection operator.

use log::debug;
use ndarray::Array2;

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::impulse::unit_pixel_in_subband;
use crate::radon::{back_project, forward_project};
use crate::subband::{Orientation, Subband};
use crate::wavelet::{array_to_coeffs, decompose, reconstruct, CoeffLayout, Wavelet, WaveletCoeffs};

/// Response of the projection/back-projection pair to a unit coefficient in
/// `source`, decomposed over `decomp_levels` levels.
///
/// The impulse lives on a `2 * image_size` grid so that periodic wavelet
/// boundaries do not fold the response back onto itself. A level-0 source
/// (only valid with `decomp_levels == 0`) is a plain centred pixel.
pub fn build_filter_response<F: PsidoFloat>(
    image_size: usize,
    source: Subband,
    angles: &[F],
    decomp_levels: usize,
    wavelet: &Wavelet,
) -> Result<WaveletCoeffs<F>> {
    if image_size == 0 || image_size % 2 != 0 {
        return Err(PsidoError::InvalidDimension(format!(
            "image size must be even and > 0, got {}",
            image_size
        )));
    }
    if decomp_levels == 0 {
        if source.level != 0 {
            return Err(PsidoError::InvalidLevel(format!(
                "source level {} requested without decomposition",
                source.level
            )));
        }
    } else {
        source.validate(decomp_levels)?;
    }

    let grid = 2 * image_size;
    let impulse = unit_pixel_in_subband::<F>(grid, source.level, source.orientation)?;

    let layout = CoeffLayout::new((grid, grid), decomp_levels)?;
    let coefficients = array_to_coeffs(impulse.view(), &layout)?;
    let image = reconstruct(&coefficients, wavelet)?;

    let sinogram = forward_project(image.view(), angles)?;
    let normal = back_project(sinogram.view(), angles)?;
    if normal.dim() != (grid, grid) {
        return Err(PsidoError::InvalidDimension(format!(
            "back-projection returned {:?} for a {}x{} grid",
            normal.dim(),
            grid,
            grid
        )));
    }

    debug!(
        "bowtie response for source {} on {}x{} grid ({} angles, {} levels, {})",
        source,
        grid,
        grid,
        angles.len(),
        decomp_levels,
        wavelet.name()
    );

    decompose(normal.view(), wavelet, decomp_levels)
}

/// The level-0 response: a centred pixel pushed through the operator
/// without any wavelet transform.
pub fn build_image_response<F: PsidoFloat>(
    image_size: usize,
    angles: &[F],
    wavelet: &Wavelet,
) -> Result<Array2<F>> {
    let coeffs = build_filter_response(
        image_size,
        Subband::new(0, Orientation::LowPass),
        angles,
        0,
        wavelet,
    )?;
    Ok(coeffs.approx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(count: usize) -> Vec<f64> {
        (0..count).map(|k| k as f64 * 180.0 / count as f64).collect()
    }

    #[test]
    fn test_response_shapes() {
        let w = Wavelet::from_name("haar").unwrap();
        let source = Subband::new(1, Orientation::Vertical);
        let coeffs = build_filter_response::<f64>(8, source, &angles(8), 2, &w).unwrap();
        assert_eq!(coeffs.levels(), 2);
        assert_eq!(coeffs.approx.dim(), (4, 4));
        assert_eq!(coeffs.details[0].dim(), (4, 4));
        assert_eq!(coeffs.details[1].dim(), (8, 8));
    }

    #[test]
    fn test_image_response_is_symmetric_and_peaked() {
        let w = Wavelet::from_name("haar").unwrap();
        let response = build_image_response::<f64>(8, &angles(16), &w).unwrap();
        assert_eq!(response.dim(), (16, 16));
        let max = response.iter().cloned().fold(f64::MIN, f64::max);
        assert!((response[[8, 8]] - max).abs() < 1e-12);

        // Angles cover the half circle uniformly, so the response is
        // symmetric under a 90 degree turn about the centre pixel.
        for d in 1..6 {
            let a = response[[8 + d, 8]];
            let b = response[[8, 8 + d]];
            assert!((a - b).abs() < 1e-3 * max, "offset {d}: {a} vs {b}");
        }
    }

    #[test]
    fn test_image_response_matches_skimage_pair() {
        // iradon(radon(impulse, [30, 100], circle=False), [30, 100],
        // filter_name=None, circle=False) for a 4x4 grid with the impulse
        // at (2, 2).
        let w = Wavelet::from_name("haar").unwrap();
        let response = build_image_response::<f64>(2, &[30.0, 100.0], &w).unwrap();
        let expected = ndarray::array![
            [0.2771557672939126, 0.7783495320125129, 0.052911291993276446, 0.009060393378718975],
            [0.0469885662275061, 0.5921862901610347, 0.4935583907538905, 0.19339137025752975],
            [0.5430251632661021, 0.8319067653178277, 1.6957397271477683, 0.8319067653178275],
            [0.2981320191424263, 0.19339137025752995, 0.4935583907538907, 0.5921862901610351],
        ];
        assert_eq!(response.dim(), expected.dim());
        for ((idx, &a), &e) in response.indexed_iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "{idx:?}: {a} vs {e}");
        }
    }

    #[test]
    fn test_response_is_deterministic() {
        let w = Wavelet::from_name("db2").unwrap();
        let source = Subband::new(2, Orientation::LowPass);
        let a = build_filter_response::<f64>(8, source, &angles(6), 2, &w).unwrap();
        let b = build_filter_response::<f64>(8, source, &angles(6), 2, &w).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_sources() {
        let w = Wavelet::from_name("haar").unwrap();
        let a = angles(4);
        assert!(matches!(
            build_filter_response::<f64>(7, Subband::new(1, Orientation::Vertical), &a, 1, &w),
            Err(PsidoError::InvalidDimension(_))
        ));
        assert!(matches!(
            build_filter_response::<f64>(0, Subband::new(0, Orientation::LowPass), &a, 0, &w),
            Err(PsidoError::InvalidDimension(_))
        ));
        assert!(matches!(
            build_filter_response::<f64>(8, Subband::new(1, Orientation::LowPass), &a, 2, &w),
            Err(PsidoError::InvalidSubband(_))
        ));
        assert!(matches!(
            build_filter_response::<f64>(8, Subband::new(3, Orientation::Vertical), &a, 2, &w),
            Err(PsidoError::InvalidLevel(_))
        ));
        assert!(matches!(
            build_filter_response::<f64>(8, Subband::new(1, Orientation::Vertical), &a, 0, &w),
            Err(PsidoError::InvalidLevel(_))
        ));
    }
}
