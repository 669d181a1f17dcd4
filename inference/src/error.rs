//! Error types for luminosity inference

use parallax_surveys::SurveyError;
use thiserror::Error;

/// Errors raised while preparing data, sampling or summarising a posterior
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Model input columns do not line up
    #[error("Column '{column}' has {actual} entries, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    /// No stars to fit
    #[error("Model input contains no stars")]
    EmptyData,

    /// An observational error is zero, negative or not finite
    #[error("Invalid {column} error {value} for star {index}")]
    InvalidUncertainty {
        column: &'static str,
        index: usize,
        value: f64,
    },

    /// An observed value is not finite
    #[error("Non-finite {column} value for star {index}")]
    NonFiniteObservation { column: &'static str, index: usize },

    /// The magnitude limited model was given no finite survey limit
    #[error("Magnitude limited model needs a finite survey limit")]
    MissingSurveyLimit,

    /// A sampler setting is out of range
    #[error("Invalid sampler configuration: {0}")]
    InvalidSamplerConfig(String),

    /// The model found no starting point with finite density
    #[error("Chain {chain}: no valid initial state after {attempts} attempts")]
    Initialisation { chain: usize, attempts: usize },

    /// Not enough parallaxes for the naive estimator
    #[error("Only {good} good parallaxes, at least {required} needed")]
    TooFewGoodParallaxes { good: usize, required: usize },

    /// Interpolation outside the tabulated domain
    #[error("Value {value} is outside domain bounds ({min}, {max})")]
    OutOfBounds { value: f64, min: f64, max: f64 },

    /// Malformed interpolation table
    #[error("Invalid lookup table: {0}")]
    InvalidTable(String),

    /// Unknown posterior parameter
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    /// Failure while rendering a figure
    #[error("Plotting error: {0}")]
    Plot(String),

    #[error(transparent)]
    Survey(#[from] SurveyError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InferenceError>;
