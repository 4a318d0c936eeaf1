//! Parallel-beam forward projection (Radon transform) and back-projection.
//!
//! Both directions keep the full field of view: the image is zero-padded to
//! its diagonal before rotation and nothing is masked to the inscribed
//! circle. Angles are in degrees.
//!
//! Back-projection is unfiltered: projections are zero-padded and taken
//! through an all-pass FFT round trip, then smeared back along their rays.

use ndarray::{s, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;

/// Minimum zero-padded projection length used by the FFT pass.
const MIN_PADDED_LENGTH: usize = 64;

#[inline]
fn degrees_to_radians<F: PsidoFloat>(angle: F) -> F {
    angle * (F::PI / F::from_f64_c(180.0))
}

fn check_angles<F: PsidoFloat>(angles: &[F]) -> Result<()> {
    if angles.is_empty() {
        return Err(PsidoError::InvalidDimension(
            "at least one projection angle is required".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Forward projection
// =============================================================================

/// Zero-pad `image` to a square whose side covers its diagonal.
fn pad_to_diagonal<F: PsidoFloat>(image: ArrayView2<F>) -> Array2<F> {
    let (rows, cols) = image.dim();
    let diagonal = std::f64::consts::SQRT_2 * rows.max(cols) as f64;
    let pad = |size: usize| (diagonal - size as f64).ceil() as usize;
    let (pad_rows, pad_cols) = (pad(rows), pad(cols));
    let before = |size: usize, pad: usize| (size + pad) / 2 - size / 2;
    let (top, left) = (before(rows, pad_rows), before(cols, pad_cols));

    let mut padded = Array2::zeros((rows + pad_rows, cols + pad_cols));
    padded
        .slice_mut(s![top..top + rows, left..left + cols])
        .assign(&image);
    padded
}

/// Bilinear sample at fractional `(r, c)`; pixels outside the image read 0.
#[inline]
fn bilinear<F: PsidoFloat>(image: &ArrayView2<F>, r: F, c: F) -> F {
    let (rows, cols) = image.dim();
    let pixel = |rr: F, cc: F| -> F {
        let ri = rr.to_isize().unwrap_or(-1);
        let ci = cc.to_isize().unwrap_or(-1);
        if ri < 0 || ci < 0 || ri as usize >= rows || ci as usize >= cols {
            F::zero()
        } else {
            image[[ri as usize, ci as usize]]
        }
    };

    let (min_r, min_c) = (r.floor(), c.floor());
    let (max_r, max_c) = (r.ceil(), c.ceil());
    let dr = r - min_r;
    let dc = c - min_c;

    let top = (F::one() - dc) * pixel(min_r, min_c) + dc * pixel(min_r, max_c);
    let bottom = (F::one() - dc) * pixel(max_r, min_c) + dc * pixel(max_r, max_c);
    (F::one() - dr) * top + dr * bottom
}

/// Line integrals of the padded square image along one direction.
fn project_angle<F: PsidoFloat>(padded: &ArrayView2<F>, angle: F) -> Vec<F> {
    let side = padded.nrows();
    let center = F::usize_as(side / 2);
    let theta = degrees_to_radians(angle);
    let (cos_a, sin_a) = (theta.cos(), theta.sin());
    let shift_c = -center * (cos_a + sin_a - F::one());
    let shift_r = -center * (cos_a - sin_a - F::one());

    let mut projection = vec![F::zero(); side];
    for r in 0..side {
        let y = F::usize_as(r);
        for (c, acc) in projection.iter_mut().enumerate() {
            let x = F::usize_as(c);
            let src_c = cos_a * x + sin_a * y + shift_c;
            let src_r = -sin_a * x + cos_a * y + shift_r;
            *acc += bilinear(padded, src_r, src_c);
        }
    }
    projection
}

/// Radon transform of `image` at `angles` (degrees).
///
/// Returns a sinogram with one column per angle and
/// `ceil(sqrt(2) * max(rows, cols))` detector bins.
pub fn forward_project<F: PsidoFloat>(image: ArrayView2<F>, angles: &[F]) -> Result<Array2<F>> {
    if image.is_empty() {
        return Err(PsidoError::InvalidDimension(
            "cannot project an empty image".to_string(),
        ));
    }
    check_angles(angles)?;

    let padded = pad_to_diagonal(image);
    let view = padded.view();
    let columns: Vec<Vec<F>> = angles
        .par_iter()
        .map(|&angle| project_angle(&view, angle))
        .collect();

    let mut sinogram = Array2::zeros((padded.nrows(), angles.len()));
    for (mut column, values) in sinogram.axis_iter_mut(Axis(1)).zip(&columns) {
        column.iter_mut().zip(values).for_each(|(dst, &v)| *dst = v);
    }
    Ok(sinogram)
}

// =============================================================================
// Back-projection
// =============================================================================

/// Zero-pad every projection (column) to the FFT length of the
/// reconstruction and take it through a forward and inverse FFT with an
/// all-pass response, as `iradon(filter=None)` does.
fn pad_and_round_trip<F: PsidoFloat>(sinogram: ArrayView2<F>) -> Array2<F> {
    let (bins, count) = sinogram.dim();
    let padded_len = (2 * bins).next_power_of_two().max(MIN_PADDED_LENGTH);

    let mut planner = FftPlanner::<F>::new();
    let forward = planner.plan_fft_forward(padded_len);
    let inverse = planner.plan_fft_inverse(padded_len);
    let norm = F::one() / F::usize_as(padded_len);

    let mut out = Array2::zeros((bins, count));
    let mut buffer = vec![Complex::new(F::zero(), F::zero()); padded_len];
    for (column, mut dst_column) in sinogram
        .axis_iter(Axis(1))
        .zip(out.axis_iter_mut(Axis(1)))
    {
        buffer.iter_mut().for_each(|v| *v = Complex::new(F::zero(), F::zero()));
        for (dst, &v) in buffer.iter_mut().zip(column.iter()) {
            *dst = Complex::new(v, F::zero());
        }
        forward.process(&mut buffer);
        inverse.process(&mut buffer);
        for (dst, v) in dst_column.iter_mut().zip(&buffer) {
            *dst = v.re * norm;
        }
    }
    out
}

/// Linear interpolation of `values` sampled at `x0, x0 + 1, ...`; zero
/// outside the sampled range.
#[inline]
fn interp_or_zero<F: PsidoFloat>(t: F, x0: F, values: &[F]) -> F {
    let n = values.len();
    let last = x0 + F::usize_as(n - 1);
    if t.is_nan() || t < x0 || t > last {
        return F::zero();
    }
    let j = (t - x0).floor().to_usize().unwrap_or(0);
    if j >= n - 1 {
        return values[n - 1];
    }
    let xj = x0 + F::usize_as(j);
    (values[j + 1] - values[j]) * (t - xj) + values[j]
}

/// Unfiltered back-projection of `sinogram` (one column per angle in
/// `angles`, degrees).
///
/// The output is square with side `floor(bins / sqrt(2))`, the inverse of
/// the padding applied by [`forward_project`].
pub fn back_project<F: PsidoFloat>(sinogram: ArrayView2<F>, angles: &[F]) -> Result<Array2<F>> {
    check_angles(angles)?;
    let (bins, count) = sinogram.dim();
    if count != angles.len() {
        return Err(PsidoError::InvalidDimension(format!(
            "sinogram has {} projections but {} angles were given",
            count,
            angles.len()
        )));
    }
    if bins == 0 {
        return Err(PsidoError::InvalidDimension(
            "sinogram has no detector bins".to_string(),
        ));
    }

    let output_size = ((bins * bins) as f64 / 2.0).sqrt().floor() as usize;
    let radius = output_size / 2;
    let filtered = pad_and_round_trip(sinogram);
    let x0 = -F::usize_as(bins / 2);

    let projections: Vec<(F, F, Vec<F>)> = angles
        .iter()
        .zip(filtered.axis_iter(Axis(1)))
        .map(|(&angle, column)| {
            let theta = degrees_to_radians(angle);
            (theta.cos(), theta.sin(), column.to_vec())
        })
        .collect();

    let rows: Vec<Vec<F>> = (0..output_size)
        .into_par_iter()
        .map(|i| {
            let xpr = F::isize_as(i as isize - radius as isize);
            let mut row = vec![F::zero(); output_size];
            for (cos_a, sin_a, values) in &projections {
                for (j, acc) in row.iter_mut().enumerate() {
                    let ypr = F::isize_as(j as isize - radius as isize);
                    let t = ypr * *cos_a - xpr * *sin_a;
                    *acc += interp_or_zero(t, x0, values);
                }
            }
            row
        })
        .collect();

    let scale = F::PI / (F::from_f64_c(2.0) * F::usize_as(angles.len()));
    let mut image = Array2::zeros((output_size, output_size));
    for (mut out, row) in image.axis_iter_mut(Axis(0)).zip(&rows) {
        out.iter_mut().zip(row).for_each(|(dst, &v)| *dst = v * scale);
    }
    Ok(image)
}
