//! Filter dictionaries: one convolution kernel per (source, target) subband
//! pair, plus the split into a fixed border and a trainable centre.
//!
//! Kernels are stored as `(k, k, 1, 1)` arrays (height, width, input
//! channels, output channels) and are flipped along both spatial axes, so
//! they can be applied as convolutions rather than correlations.

use std::collections::BTreeMap;

use log::{info, warn};
use ndarray::{s, Array4, ArrayView2, Axis};

use crate::bowtie::build_filter_response;
use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::subband::{
    kept_subbands, FilterKey, Orientation, Subband, PARAMETER_ORDER, SOURCE_ORDER, TARGET_ORDER,
};
use crate::wavelet::Wavelet;

/// Kernels keyed by subband pair.
pub type FilterDictionary<F> = BTreeMap<FilterKey, Array4<F>>;

/// Flip a block along both axes and append two singleton channel axes.
pub fn to_kernel<F: PsidoFloat>(block: ArrayView2<F>) -> Array4<F> {
    block
        .slice(s![..;-1, ..;-1])
        .to_owned()
        .insert_axis(Axis(2))
        .insert_axis(Axis(3))
}

/// Build every bowtie kernel for an `image_size` reconstruction decomposed
/// over `decomp_levels` levels.
///
/// With `decomp_levels == 0` the dictionary holds the single
/// [`FilterKey::Image`] kernel.
pub fn build_dictionary<F: PsidoFloat>(
    image_size: usize,
    decomp_levels: usize,
    angles: &[F],
    wavelet: &Wavelet,
) -> Result<FilterDictionary<F>> {
    if image_size == 0 || image_size % 2 != 0 {
        return Err(PsidoError::InvalidDimension(format!(
            "image size must be even and > 0, got {}",
            image_size
        )));
    }

    let mut dictionary = FilterDictionary::new();

    if decomp_levels == 0 {
        let response = build_filter_response::<F>(
            image_size,
            Subband::new(0, Orientation::LowPass),
            angles,
            0,
            wavelet,
        )?;
        dictionary.insert(FilterKey::Image, to_kernel(response.approx.view()));
        return Ok(dictionary);
    }

    let targets = kept_subbands(decomp_levels, &TARGET_ORDER);
    for source in kept_subbands(decomp_levels, &SOURCE_ORDER) {
        let response = build_filter_response::<F>(image_size, source, angles, decomp_levels, wavelet)?;
        for &target in &targets {
            let block = response.subband(target)?;
            dictionary.insert(FilterKey::pair(source, target), to_kernel(block));
        }
    }

    info!(
        "built {} bowtie filters ({}x{} image, {} levels, {} angles, {})",
        dictionary.len(),
        image_size,
        image_size,
        decomp_levels,
        angles.len(),
        wavelet.name()
    );
    Ok(dictionary)
}

/// Bounds `[lo, hi)` of the trainable window inside a kernel of side `full`.
pub fn trainable_window(full: usize, trainable_size: usize) -> Result<(usize, usize)> {
    if trainable_size > full {
        return Err(PsidoError::InvalidDimension(format!(
            "trainable size {} exceeds filter size {}",
            trainable_size, full
        )));
    }
    Ok(((full - trainable_size) / 2, (full + trainable_size) / 2))
}

/// Check that `dictionary` holds exactly the keys of a `decomp_levels` deep
/// decomposition.
pub fn check_keys<F: PsidoFloat>(dictionary: &FilterDictionary<F>, decomp_levels: usize) -> Result<()> {
    let expected = FilterKey::all(decomp_levels, &PARAMETER_ORDER, &PARAMETER_ORDER);
    if let Some(missing) = expected.iter().find(|key| !dictionary.contains_key(*key)) {
        return Err(PsidoError::SchemaMismatch(format!(
            "filter {} missing from a {}-level dictionary",
            missing, decomp_levels
        )));
    }
    if dictionary.len() != expected.len() {
        return Err(PsidoError::SchemaMismatch(format!(
            "{} filters in a {}-level dictionary, expected {}",
            dictionary.len(),
            decomp_levels,
            expected.len()
        )));
    }
    Ok(())
}

/// Split each kernel into a fixed border (centre square zeroed) and the
/// trainable centre square of side `trainable_size`.
///
/// The border keeps every value outside rows and columns `[lo, hi)`,
/// corners included; only the centre square is cleared.
pub fn split_fixed_and_trainable<F: PsidoFloat>(
    dictionary: &FilterDictionary<F>,
    decomp_levels: usize,
    trainable_size: usize,
) -> Result<(FilterDictionary<F>, FilterDictionary<F>)> {
    check_keys(dictionary, decomp_levels)?;

    let mut border = FilterDictionary::new();
    let mut center = FilterDictionary::new();

    for (key, kernel) in dictionary {
        let full = kernel.shape()[0];
        let (lo, hi) = trainable_window(full, trainable_size)?;
        if (full - trainable_size) % 2 != 0 {
            warn!(
                "filter {} of side {} cannot centre a {} window; shifting it to [{}, {})",
                key, full, trainable_size, lo, hi
            );
        }

        let mut holed = kernel.clone();
        holed.slice_mut(s![lo..hi, lo..hi, .., ..]).fill(F::zero());
        border.insert(*key, holed);
        center.insert(*key, kernel.slice(s![lo..hi, lo..hi, .., ..]).to_owned());
    }

    Ok((border, center))
}

/// Reinsert trainable centres into their borders: the inverse of
/// [`split_fixed_and_trainable`].
pub fn merge_fixed_and_trainable<F: PsidoFloat>(
    border: &FilterDictionary<F>,
    center: &FilterDictionary<F>,
) -> Result<FilterDictionary<F>> {
    let mut merged = FilterDictionary::new();
    for (key, fixed) in border {
        let trainable = center.get(key).ok_or_else(|| {
            PsidoError::SchemaMismatch(format!("no trainable centre for filter {}", key))
        })?;
        let (lo, hi) = trainable_window(fixed.shape()[0], trainable.shape()[0])?;
        let mut kernel = fixed.clone();
        let mut window = kernel.slice_mut(s![lo..hi, lo..hi, .., ..]);
        if window.shape() != trainable.shape() {
            return Err(PsidoError::InvalidDimension(format!(
                "centre of filter {} has shape {:?}, window is {:?}",
                key,
                trainable.shape(),
                window.shape()
            )));
        }
        window.assign(trainable);
        merged.insert(*key, kernel);
    }
    if center.len() != border.len() {
        return Err(PsidoError::SchemaMismatch(format!(
            "{} trainable centres for {} fixed borders",
            center.len(),
            border.len()
        )));
    }
    Ok(merged)
}

/// The 2D block of a `(k, k, 1, 1)` kernel.
#[cfg(test)]
pub(crate) fn kernel_block<F: PsidoFloat>(kernel: &Array4<F>) -> ArrayView2<'_, F> {
    kernel.slice(s![.., .., 0, 0])
}

/// Undo [`to_kernel`]: the unflipped 2D block.
#[cfg(test)]
pub(crate) fn kernel_to_block<F: PsidoFloat>(kernel: &Array4<F>) -> ndarray::Array2<F> {
    kernel.slice(s![..;-1, ..;-1, 0, 0]).to_owned()
}
