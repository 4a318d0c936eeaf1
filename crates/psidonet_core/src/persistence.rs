//! Save and restore parameter bundles as `.npy` / `.npz` files.
//!
//! A snapshot directory holds four artifacts:
//! - `dictionaries.npz`: one entry `D_<stage>_<key>` per stage and filter
//! - `thetas.npy`, `alphas.npy`, `betas.npy`: one value per stage
//!
//! Arrays may be stored as `f64` or `f32`; restoring casts them to the
//! requested precision.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{Array1, Array4, ArrayD, Axis, Ix2, Ix4, IxDyn, OwnedRepr};
use ndarray_npy::{read_npy, write_npy, NpzReader, NpzWriter, ReadNpyError, ReadNpzError};

use crate::error::{PsidoError, Result};
use crate::float_trait::PsidoFloat;
use crate::parameters::{filter_variable_name, ParameterBundle, StageDictionary, Variable};
use crate::subband::FilterKey;

pub const DICTIONARIES_FILE: &str = "dictionaries.npz";
pub const THETAS_FILE: &str = "thetas.npy";
pub const ALPHAS_FILE: &str = "alphas.npy";
pub const BETAS_FILE: &str = "betas.npy";

/// Write `bundle` into `dir`, creating the directory if needed.
pub fn save<F: PsidoFloat>(bundle: &ParameterBundle<F>, dir: &Path) -> Result<()> {
    bundle.validate()?;
    fs::create_dir_all(dir)?;

    let file = BufWriter::new(File::create(dir.join(DICTIONARIES_FILE))?);
    let mut npz = NpzWriter::new(file);
    for (index, stage) in bundle.dictionaries.iter().enumerate() {
        for (key, variable) in stage {
            npz.add_array(filter_variable_name(index + 1, key), &variable.value)?;
        }
    }
    npz.finish()?.flush()?;

    let scalars = |vars: &[Variable<F>]| -> Array1<F> { vars.iter().map(|v| v.value).collect() };
    write_npy(dir.join(THETAS_FILE), &scalars(&bundle.thetas))?;
    write_npy(dir.join(ALPHAS_FILE), &scalars(&bundle.alphas))?;
    write_npy(dir.join(BETAS_FILE), &scalars(&bundle.betas))?;

    info!("saved {} stages to {}", bundle.num_stages(), dir.display());
    Ok(())
}

/// Load a bundle of `num_stages` stages from `dir`. Every variable gets
/// the same `trainable` flag.
pub fn restore<F: PsidoFloat>(
    dir: &Path,
    num_stages: usize,
    trainable: bool,
) -> Result<ParameterBundle<F>> {
    let dictionaries_path = artifact(dir, DICTIONARIES_FILE)?;
    let thetas_path = artifact(dir, THETAS_FILE)?;
    let alphas_path = artifact(dir, ALPHAS_FILE)?;
    let betas_path = artifact(dir, BETAS_FILE)?;

    let thetas = read_scalars::<F>(&thetas_path, "theta", num_stages, trainable)?;
    let alphas = read_scalars::<F>(&alphas_path, "alpha", num_stages, trainable)?;
    let betas = read_scalars::<F>(&betas_path, "beta", num_stages, trainable)?;
    let dictionaries = read_dictionaries::<F>(&dictionaries_path, num_stages, trainable)?;

    let bundle = ParameterBundle {
        dictionaries,
        thetas,
        alphas,
        betas,
    };
    bundle.validate()?;

    info!(
        "restored {} stages from {} (trainable: {})",
        num_stages,
        dir.display(),
        trainable
    );
    Ok(bundle)
}

fn artifact(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PsidoError::NotFound(path))
    }
}

/// Read a 1-D `.npy` file of `f64` or `f32` values as `F`.
fn read_float_npy<F: PsidoFloat>(path: &Path) -> Result<Array1<F>> {
    match read_npy::<_, Array1<f64>>(path) {
        Ok(values) => Ok(values.mapv(F::from_f64_c)),
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let values: Array1<f32> = read_npy(path)?;
            Ok(values.mapv(|v| F::from_f64_c(f64::from(v))))
        }
        Err(err) => Err(err.into()),
    }
}

/// Read archive entry `name` stored as `f64` or `f32` as `F`.
fn read_float_entry<F: PsidoFloat, R: Read + Seek>(
    npz: &mut NpzReader<R>,
    name: &str,
) -> Result<ArrayD<F>> {
    match npz.by_name::<OwnedRepr<f64>, IxDyn>(name) {
        Ok(array) => Ok(array.mapv(F::from_f64_c)),
        Err(ReadNpzError::Npy(ReadNpyError::WrongDescriptor(_))) => {
            let array = npz.by_name::<OwnedRepr<f32>, IxDyn>(name)?;
            Ok(array.mapv(|v| F::from_f64_c(f64::from(v))))
        }
        Err(err) => Err(err.into()),
    }
}

fn read_scalars<F: PsidoFloat>(
    path: &Path,
    prefix: &str,
    num_stages: usize,
    trainable: bool,
) -> Result<Vec<Variable<F>>> {
    let values = read_float_npy::<F>(path)?;
    if values.len() != num_stages {
        return Err(PsidoError::SchemaMismatch(format!(
            "{} holds {} values for {} stages",
            path.display(),
            values.len(),
            num_stages
        )));
    }
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| Variable::new(format!("{}_{}", prefix, i + 1), v, trainable))
        .collect())
}

/// Split an archive entry name `D_<stage>_<key>[.npy]` into its parts.
fn parse_entry_name(name: &str) -> Result<(usize, FilterKey)> {
    let mismatch = || PsidoError::SchemaMismatch(format!("unexpected dictionary entry '{}'", name));
    let stem = name.strip_suffix(".npy").unwrap_or(name);
    let (stage, key) = stem
        .strip_prefix("D_")
        .and_then(|rest| rest.split_once('_'))
        .ok_or_else(mismatch)?;
    let stage = stage.parse::<usize>().map_err(|_| mismatch())?;
    let key = key.parse::<FilterKey>().map_err(|_| mismatch())?;
    Ok((stage, key))
}

/// Promote a stored filter to `(k, k, 1, 1)`.
fn to_filter<F: PsidoFloat>(name: &str, array: ArrayD<F>) -> Result<Array4<F>> {
    let mismatch = |ndim: usize| {
        PsidoError::SchemaMismatch(format!("entry '{}' is {}-D, expected 2-D or 4-D", name, ndim))
    };
    match array.ndim() {
        2 => Ok(array
            .into_dimensionality::<Ix2>()
            .map_err(|_| mismatch(2))?
            .insert_axis(Axis(2))
            .insert_axis(Axis(3))),
        4 => array.into_dimensionality::<Ix4>().map_err(|_| mismatch(4)),
        ndim => Err(mismatch(ndim)),
    }
}

fn read_dictionaries<F: PsidoFloat>(
    path: &Path,
    num_stages: usize,
    trainable: bool,
) -> Result<Vec<StageDictionary<F>>> {
    let mut npz = NpzReader::new(BufReader::new(File::open(path)?))?;

    let mut stages: BTreeMap<usize, StageDictionary<F>> = BTreeMap::new();
    for name in npz.names()? {
        let (stage, key) = parse_entry_name(&name)?;
        if stage == 0 || stage > num_stages {
            return Err(PsidoError::SchemaMismatch(format!(
                "entry '{}' belongs to stage {} of {}",
                name, stage, num_stages
            )));
        }
        let array = read_float_entry::<F, _>(&mut npz, &name)?;
        let filter = to_filter(&name, array)?;
        stages.entry(stage).or_default().insert(
            key,
            Variable::new(filter_variable_name(stage, &key), filter, trainable),
        );
    }

    (1..=num_stages)
        .map(|stage| {
            stages.remove(&stage).ok_or_else(|| {
                PsidoError::SchemaMismatch(format!(
                    "{} has no filters for stage {}",
                    path.display(),
                    stage
                ))
            })
        })
        .collect()
}
