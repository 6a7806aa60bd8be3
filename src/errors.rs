use std::path::PathBuf;

use thiserror::Error;

use crate::data_structs::array_design::ArrayDesign;

/// Error taxonomy for the normalization pipeline.
///
/// Input-validity conditions (malformed shapes, mismatched subset sizes,
/// negative parameters) are kept distinct from model-degeneracy conditions
/// (zero scale, non-positive rate/scale parameters): the former point at the
/// caller, the latter mean the statistical model cannot be fit for this data.
/// Numerical-precision events are never surfaced here; they are recovered
/// locally and logged.
#[derive(Debug, Error)]
pub enum MethylNormError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cannot estimate scale: MAD is zero for this sample")]
    DegenerateScale,

    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("array design '{0}' is not supported")]
    UnsupportedDesign(ArrayDesign),

    #[error("all samples must share one array design, got {0:?}")]
    MixedDesigns(Vec<ArrayDesign>),

    #[error("no idat file found for basepath '{}'", .0.display())]
    MissingIdat(PathBuf),

    #[error("malformed idat file: {0}")]
    MalformedIdat(String),

    #[error("checksum mismatch for '{}': expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path:     PathBuf,
        expected: String,
        actual:   String,
    },

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error("table serialization failed: {0}")]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MethylNormError>;
