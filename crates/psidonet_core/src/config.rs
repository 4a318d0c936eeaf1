//! Geometry and unrolling configuration.
//!
//! Both halves carry defaults and a `validate()` check; the combined
//! [`PsidoNetConfig`] is what a training or inference driver reads from a
//! JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::parameters::Variant;
use crate::wavelet::Wavelet;

// =============================================================================
// Constants
// =============================================================================

/// Default reconstructed image side. Default: 128
pub const DEFAULT_IMAGE_SIZE: usize = 128;

/// Default number of projection angles. Default: 60
pub const DEFAULT_NUM_ANGLES: usize = 60;

/// Default angular range covered by the projections, in degrees.
pub const DEFAULT_ANGLE_SPAN: f64 = 180.0;

/// Default number of wavelet scales.
pub const DEFAULT_DECOMP_LEVELS: usize = 3;

pub const DEFAULT_WAVELET: &str = "haar";

/// Default side of the learned filters (or trainable centres).
pub const DEFAULT_FILTER_SIZE: usize = 8;

/// Default ISTA regularisation weight.
pub const DEFAULT_MU: f64 = 1e-5;

/// Default ISTA Lipschitz constant.
pub const DEFAULT_LIPSCHITZ: f64 = 1.0;

/// Default number of unrolled stages with independent parameters.
pub const DEFAULT_NUM_STAGES: usize = 40;

/// First seed of the operator-mode initialisation counter.
pub const DEFAULT_SEED: u64 = 0;

// =============================================================================
// Types
// =============================================================================

/// Acquisition and representation geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeometryConfig {
    /// Side of the square reconstruction (even). Default: 128
    pub image_size: usize,
    /// Projection angles in degrees. Default: 60 angles over [0, 180)
    pub angles: Vec<f64>,
    /// Number of wavelet scales; 0 disables the decomposition. Default: 3
    pub decomp_levels: usize,
    /// Wavelet family name. Default: "haar"
    pub wavelet: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            angles: uniform_angles(DEFAULT_NUM_ANGLES, DEFAULT_ANGLE_SPAN),
            decomp_levels: DEFAULT_DECOMP_LEVELS,
            wavelet: DEFAULT_WAVELET.to_string(),
        }
    }
}

impl GeometryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the geometry.
    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 || self.image_size % 2 != 0 {
            return Err(PsidoError::InvalidDimension(format!(
                "image_size must be even and > 0, got {}",
                self.image_size
            )));
        }
        if self.angles.is_empty() {
            return Err(PsidoError::InvalidConfig(
                "at least one projection angle is required".to_string(),
            ));
        }
        if self.angles.iter().any(|a| !a.is_finite()) {
            return Err(PsidoError::InvalidConfig(
                "projection angles must be finite".to_string(),
            ));
        }
        // Bowties live on a grid twice the image size; every subband block
        // of that grid must have an even side to hold a centred impulse.
        if self.decomp_levels >= usize::BITS as usize
            || self.image_size % (1 << self.decomp_levels) != 0
        {
            return Err(PsidoError::InvalidLevel(format!(
                "{} levels do not fit a {}x{} image",
                self.decomp_levels, self.image_size, self.image_size
            )));
        }
        self.wavelet()?;
        Ok(())
    }

    /// The configured wavelet family.
    pub fn wavelet(&self) -> Result<Wavelet> {
        Wavelet::from_name(&self.wavelet)
    }

    /// Angles converted to the working precision.
    pub fn angles_as<F: PsidoFloat>(&self) -> Vec<F> {
        self.angles.iter().map(|&a| F::from_f64_c(a)).collect()
    }
}

/// Unrolled-network hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnrollingConfig {
    /// Side of each learned filter, or of the trainable centre in filter
    /// mode. Default: 8
    pub filter_size: usize,
    /// ISTA regularisation weight. Default: 1e-5
    pub mu: f64,
    /// ISTA Lipschitz constant. Default: 1.0
    pub lipschitz: f64,
    /// Number of stages with their own parameters. Default: 40
    pub num_stages: usize,
    pub variant: Variant,
    /// First seed of the operator-mode initialisation. Default: 0
    pub seed: u64,
    /// Whether the created variables are trainable. Default: true
    pub trainable: bool,
}

impl Default for UnrollingConfig {
    fn default() -> Self {
        Self {
            filter_size: DEFAULT_FILTER_SIZE,
            mu: DEFAULT_MU,
            lipschitz: DEFAULT_LIPSCHITZ,
            num_stages: DEFAULT_NUM_STAGES,
            variant: Variant::default(),
            seed: DEFAULT_SEED,
            trainable: true,
        }
    }
}

impl UnrollingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if self.filter_size == 0 {
            return Err(PsidoError::InvalidConfig("filter_size must be > 0".to_string()));
        }
        if self.num_stages == 0 {
            return Err(PsidoError::InvalidConfig("num_stages must be > 0".to_string()));
        }
        if !(self.lipschitz.is_finite() && self.lipschitz > 0.0) {
            return Err(PsidoError::InvalidConfig("lipschitz must be > 0".to_string()));
        }
        if !(self.mu.is_finite() && self.mu >= 0.0) {
            return Err(PsidoError::InvalidConfig("mu must be >= 0".to_string()));
        }
        if self.variant.uses_log_threshold() && self.mu == 0.0 {
            return Err(PsidoError::InvalidConfig(format!(
                "{} stores log10(mu / L) and needs mu > 0",
                self.variant
            )));
        }
        Ok(())
    }
}

/// Everything needed to create or restore a parameter bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsidoNetConfig {
    pub geometry: GeometryConfig,
    pub unrolling: UnrollingConfig,
}

impl PsidoNetConfig {
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.unrolling.validate()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Read and validate a JSON configuration file.
pub fn load_config(path: &Path) -> Result<PsidoNetConfig> {
    let contents = fs::read_to_string(path)?;
    let config: PsidoNetConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// `count` angles evenly spaced over `[0, span_degrees)`.
pub fn uniform_angles(count: usize, span_degrees: f64) -> Vec<f64> {
    (0..count)
        .map(|k| k as f64 * span_degrees / count as f64)
        .collect()
}
