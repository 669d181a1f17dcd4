//! Error types for survey generation and plotting

use thiserror::Error;

/// Errors raised while configuring, generating or plotting a survey
#[derive(Debug, Error)]
pub enum SurveyError {
    /// The distance range is empty, inverted or not strictly positive
    #[error("Invalid distance range: min {min} pc, max {max} pc (need 0 < min < max)")]
    InvalidDistanceRange { min: f64, max: f64 },

    /// A survey needs at least one simulated star
    #[error("Number of simulated stars must be positive")]
    NoStars,

    /// The absolute magnitude distribution is not a proper normal distribution
    #[error("Invalid absolute magnitude distribution: mean {mean}, sigma {sigma}")]
    InvalidMagnitudeDistribution { mean: f64, sigma: f64 },

    /// The survey limit is NaN
    #[error("Survey limiting magnitude must be a number")]
    InvalidSurveyLimit,

    /// No simulated star is bright enough to enter the survey
    #[error("No stars brighter than the survey limit {limit:.2} out of {simulated} simulated")]
    EmptySurvey { limit: f64, simulated: usize },

    /// Failure while rendering a figure
    #[error("Plotting error: {0}")]
    Plot(String),

    /// I/O failure while writing a figure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
