//! Per-stage parameters of the unrolled network.
//!
//! Every stage owns a filter dictionary and three scalars (`theta`, `alpha`,
//! `beta`). Operator-mode variants learn whole filters from a Xavier
//! initialisation; filter-mode variants learn only the centre of the bowtie
//! filters while the border stays fixed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, info};
use ndarray::Array4;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GeometryConfig, UnrollingConfig};
use crate::dictionary::{build_dictionary, split_fixed_and_trainable, FilterDictionary};
use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::subband::{FilterKey, PARAMETER_ORDER};

/// Network variant. `O` variants learn the operator filters from scratch,
/// `F` variants refine the centre of the bowtie filters. `plus` variants
/// store the threshold as `log10(mu / L)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Variant {
    #[default]
    PSIDONetO,
    PSIDONetOplus,
    PSIDONetF,
    PSIDONetFplus,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::PSIDONetO => "PSIDONetO",
            Variant::PSIDONetOplus => "PSIDONetOplus",
            Variant::PSIDONetF => "PSIDONetF",
            Variant::PSIDONetFplus => "PSIDONetFplus",
        }
    }

    /// Filter-based variants start from the bowtie dictionary.
    pub fn is_filter_based(self) -> bool {
        matches!(self, Variant::PSIDONetF | Variant::PSIDONetFplus)
    }

    pub fn uses_log_threshold(self) -> bool {
        matches!(self, Variant::PSIDONetOplus | Variant::PSIDONetFplus)
    }

    /// Initial threshold for a stage.
    pub fn initial_theta(self, mu: f64, lipschitz: f64) -> f64 {
        if self.uses_log_threshold() {
            (mu / lipschitz).log10()
        } else {
            mu / lipschitz
        }
    }

    /// Initial weight of the learned filters against the fixed ones.
    pub fn initial_beta(self) -> f64 {
        if self.is_filter_based() {
            1.0
        } else {
            0.0
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = PsidoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PSIDONetO" => Ok(Variant::PSIDONetO),
            "PSIDONetOplus" => Ok(Variant::PSIDONetOplus),
            "PSIDONetF" => Ok(Variant::PSIDONetF),
            "PSIDONetFplus" => Ok(Variant::PSIDONetFplus),
            other => Err(PsidoError::UnknownVariant(other.to_string())),
        }
    }
}

/// A named value handed to the training system.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable<T> {
    pub name: String,
    pub value: T,
    pub trainable: bool,
}

impl<T> Variable<T> {
    pub fn new(name: impl Into<String>, value: T, trainable: bool) -> Self {
        Self {
            name: name.into(),
            value,
            trainable,
        }
    }
}

/// Name of filter `key` in stage `stage` (1-based).
pub fn filter_variable_name(stage: usize, key: &FilterKey) -> String {
    format!("D_{}_{}", stage, key)
}

/// Filters of one stage, as named variables.
pub type StageDictionary<F> = BTreeMap<FilterKey, Variable<Array4<F>>>;

/// All learnable state of the unrolled network: four parallel sequences,
/// one entry per stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBundle<F> {
    pub dictionaries: Vec<StageDictionary<F>>,
    pub thetas: Vec<Variable<F>>,
    pub alphas: Vec<Variable<F>>,
    pub betas: Vec<Variable<F>>,
}

impl<F: PsidoFloat> ParameterBundle<F> {
    pub fn num_stages(&self) -> usize {
        self.thetas.len()
    }

    /// Plain filter values of stage `index` (0-based).
    pub fn stage_filters(&self, index: usize) -> Option<FilterDictionary<F>> {
        self.dictionaries.get(index).map(|stage| {
            stage
                .iter()
                .map(|(key, var)| (*key, var.value.clone()))
                .collect()
        })
    }

    /// Check that the four sequences agree on the stage count and every
    /// stage carries the same filter keys and shapes.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_stages();
        if self.alphas.len() != n || self.betas.len() != n || self.dictionaries.len() != n {
            return Err(PsidoError::SchemaMismatch(format!(
                "stage counts differ: {} dictionaries, {} thetas, {} alphas, {} betas",
                self.dictionaries.len(),
                n,
                self.alphas.len(),
                self.betas.len()
            )));
        }

        let Some(first) = self.dictionaries.first() else {
            return Ok(());
        };
        for (i, stage) in self.dictionaries.iter().enumerate().skip(1) {
            let same_layout = stage.len() == first.len()
                && stage
                    .iter()
                    .zip(first)
                    .all(|((k, v), (k0, v0))| k == k0 && v.value.shape() == v0.value.shape());
            if !same_layout {
                return Err(PsidoError::SchemaMismatch(format!(
                    "stage {} filters differ from stage 1",
                    i + 1
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Initialisation
// =============================================================================

/// Xavier/Glorot uniform sample for a `(k, k, 1, 1)` kernel.
fn xavier_uniform<F: PsidoFloat>(filter_size: usize, seed: u64) -> Array4<F> {
    let fan = (filter_size * filter_size) as f64;
    let limit = (6.0 / (fan + fan)).sqrt();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array4::from_shape_simple_fn((filter_size, filter_size, 1, 1), || {
        F::from_f64_c(rng.gen_range(-limit..limit))
    })
}

/// Freshly initialised filters of one operator-mode stage.
///
/// `seed` is advanced once per filter, in parameter order, so consecutive
/// stages sharing one counter never reuse a seed.
pub fn initialize_operator_filters<F: PsidoFloat>(
    filter_size: usize,
    decomp_levels: usize,
    stage: usize,
    seed: &mut u64,
    trainable: bool,
) -> StageDictionary<F> {
    let mut filters = StageDictionary::new();
    for key in FilterKey::all(decomp_levels, &PARAMETER_ORDER, &PARAMETER_ORDER) {
        let kernel = xavier_uniform::<F>(filter_size, *seed);
        *seed = seed.wrapping_add(1);
        filters.insert(
            key,
            Variable::new(filter_variable_name(stage, &key), kernel, trainable),
        );
    }
    filters
}

/// Wrap existing kernels as the variables of one stage.
pub fn stage_from_filters<F: PsidoFloat>(
    filters: &FilterDictionary<F>,
    stage: usize,
    trainable: bool,
) -> StageDictionary<F> {
    filters
        .iter()
        .map(|(key, kernel)| {
            (
                *key,
                Variable::new(filter_variable_name(stage, key), kernel.clone(), trainable),
            )
        })
        .collect()
}

/// Bowtie dictionary for `geometry`, split into its fixed border and
/// trainable centre of side `filter_size`.
fn bowtie_split<F: PsidoFloat>(
    geometry: &GeometryConfig,
    filter_size: usize,
) -> Result<(FilterDictionary<F>, FilterDictionary<F>)> {
    let wavelet = geometry.wavelet()?;
    let angles = geometry.angles_as::<F>();
    let dictionary = build_dictionary(geometry.image_size, geometry.decomp_levels, &angles, &wavelet)?;
    split_fixed_and_trainable(&dictionary, geometry.decomp_levels, filter_size)
}

/// The fixed border of the bowtie filters used by filter-based variants.
pub fn fixed_operator<F: PsidoFloat>(
    geometry: &GeometryConfig,
    filter_size: usize,
) -> Result<FilterDictionary<F>> {
    geometry.validate()?;
    let (border, _) = bowtie_split(geometry, filter_size)?;
    Ok(border)
}

/// Create the parameters of every stage.
pub fn initialize<F: PsidoFloat>(
    geometry: &GeometryConfig,
    unrolling: &UnrollingConfig,
) -> Result<ParameterBundle<F>> {
    geometry.validate()?;
    unrolling.validate()?;

    let variant = unrolling.variant;
    let trainable = unrolling.trainable;
    let num_stages = unrolling.num_stages;

    let theta = F::from_f64_c(variant.initial_theta(unrolling.mu, unrolling.lipschitz));
    let alpha = F::from_f64_c(1.0 / unrolling.lipschitz);
    let beta = F::from_f64_c(variant.initial_beta());

    // The bowtie dictionary does not depend on the stage: build it once.
    let centres = if variant.is_filter_based() {
        let (_, centre) = bowtie_split::<F>(geometry, unrolling.filter_size)?;
        Some(centre)
    } else {
        None
    };

    let mut seed = unrolling.seed;
    let mut bundle = ParameterBundle {
        dictionaries: Vec::with_capacity(num_stages),
        thetas: Vec::with_capacity(num_stages),
        alphas: Vec::with_capacity(num_stages),
        betas: Vec::with_capacity(num_stages),
    };

    for stage in 1..=num_stages {
        let filters = match &centres {
            Some(centre) => stage_from_filters(centre, stage, trainable),
            None => initialize_operator_filters(
                unrolling.filter_size,
                geometry.decomp_levels,
                stage,
                &mut seed,
                trainable,
            ),
        };
        debug!("stage {}: {} filters", stage, filters.len());

        bundle.dictionaries.push(filters);
        bundle
            .thetas
            .push(Variable::new(format!("theta_{}", stage), theta, trainable));
        bundle
            .alphas
            .push(Variable::new(format!("alpha_{}", stage), alpha, trainable));
        bundle
            .betas
            .push(Variable::new(format!("beta_{}", stage), beta, trainable));
    }

    info!(
        "initialised {} with {} stages ({} filters per stage)",
        variant,
        num_stages,
        bundle.dictionaries.first().map_or(0, |d| d.len())
    );
    Ok(bundle)
}
