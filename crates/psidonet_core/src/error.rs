//! Error type shared by filter construction, configuration and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the crate. All of them are configuration or programming
/// errors: nothing here is retried.
#[derive(Debug, Error)]
pub enum PsidoError {
    /// A size that must be even (or divisible by a power of two) is not.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A wavelet level the image or decomposition cannot support.
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    /// A subband that breaks the low-pass-only-at-coarsest-level rule.
    #[error("invalid subband: {0}")]
    InvalidSubband(String),

    #[error("unknown wavelet family '{0}'")]
    UnknownWavelet(String),

    #[error("unknown network variant '{0}'")]
    UnknownVariant(String),

    /// A filter key string that does not follow `F_<sl>_<so>_<tl>_<to>`.
    #[error("invalid filter key '{0}'")]
    InvalidKey(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted parameter artifact is missing.
    #[error("parameter artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Persisted artifacts disagree with each other or with the stage count.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    ReadNpz(#[from] ndarray_npy::ReadNpzError),

    #[error(transparent)]
    WriteNpz(#[from] ndarray_npy::WriteNpzError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PsidoError>;
