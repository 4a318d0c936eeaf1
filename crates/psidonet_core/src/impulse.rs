//! Unit impulses in pixel space or inside one wavelet subband.
//!
//! The subband variant lays the impulse out in the flat coefficient-array
//! convention of [`crate::wavelet::coeffs_to_array`], so the result can be
//! reinterpreted as a coefficient tree and reconstructed.

use ndarray::{s, Array2};

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::subband::Orientation;

/// `size x size` zeros with a single one at `(size / 2, size / 2)`.
pub fn unit_pixel_block<F: PsidoFloat>(size: usize) -> Result<Array2<F>> {
    if size == 0 || size % 2 != 0 {
        return Err(PsidoError::InvalidDimension(format!(
            "block size must be even and > 0, got {}",
            size
        )));
    }
    let mut block = Array2::zeros((size, size));
    block[[size / 2, size / 2]] = F::one();
    Ok(block)
}

/// Row/column origin of the quadrant holding `orientation` inside the
/// `2 * block_size` square of one decomposition level.
pub fn quadrant_origin(orientation: Orientation, block_size: usize) -> (usize, usize) {
    match orientation {
        Orientation::LowPass => (0, 0),
        Orientation::Horizontal => (0, block_size),
        Orientation::Vertical => (block_size, 0),
        Orientation::Diagonal => (block_size, block_size),
    }
}

/// `image_size x image_size` zeros with a centred one inside the
/// `(level, orientation)` block of a dyadic coefficient layout.
///
/// Level 0 is the undecomposed image: the impulse sits at the image centre
/// and `orientation` is ignored.
pub fn unit_pixel_in_subband<F: PsidoFloat>(
    image_size: usize,
    level: usize,
    orientation: Orientation,
) -> Result<Array2<F>> {
    if image_size == 0 || image_size % 2 != 0 {
        return Err(PsidoError::InvalidDimension(format!(
            "image size must be even and > 0, got {}",
            image_size
        )));
    }
    if level == 0 {
        return unit_pixel_block(image_size);
    }
    if level >= usize::BITS as usize || image_size >> level == 0 {
        return Err(PsidoError::InvalidLevel(format!(
            "level {} leaves no subband block in a {}x{} image",
            level, image_size, image_size
        )));
    }

    let block_size = image_size >> level;
    let (row, col) = quadrant_origin(orientation, block_size);

    let mut image = Array2::zeros((image_size, image_size));
    image
        .slice_mut(s![row..row + block_size, col..col + block_size])
        .assign(&unit_pixel_block::<F>(block_size)?);
    Ok(image)
}
