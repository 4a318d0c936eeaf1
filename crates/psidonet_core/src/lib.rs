//! PsiDONet Core Library
//!
//! Bowtie filter construction for unrolled wavelet-domain tomographic
//! reconstruction: unit impulses in wavelet subbands, a periodized 2D wavelet
//! codec, the Radon projection pair, filter dictionaries and the per-stage
//! parameter store with its `.npy` persistence.

pub mod bowtie;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod float_trait;
pub mod impulse;
pub mod parameters;
pub mod persistence;
pub mod radon;
pub mod subband;
pub mod wavelet;

// Re-export commonly used types at the crate root
pub use bowtie::{build_filter_response, build_image_response};
pub use config::{load_config, uniform_angles, GeometryConfig, PsidoNetConfig, UnrollingConfig};
pub use dictionary::{
    build_dictionary, merge_fixed_and_trainable, split_fixed_and_trainable, FilterDictionary,
};
pub use error::{PsidoError, Result};
pub use float_trait::PsidoFloat;
pub use impulse::{unit_pixel_block, unit_pixel_in_subband};
pub use parameters::{fixed_operator, initialize, ParameterBundle, Variable, Variant};
pub use persistence::{restore, save};
pub use radon::{back_project, forward_project};
pub use subband::{FilterKey, Orientation, Subband};
pub use wavelet::{array_to_coeffs, coeffs_to_array, decompose, reconstruct, CoeffLayout, Wavelet, WaveletCoeffs};
