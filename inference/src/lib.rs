//! Bayesian calibration of stellar luminosity from parallax surveys
//!
//! Fits a hierarchical model for the mean absolute magnitude and its spread
//! to a survey of parallaxes and apparent magnitudes, either treating the
//! survey as volume complete or correcting for an apparent magnitude limit.
//! A naive inverted-parallax estimate with Lutz-Kelker corrections is
//! provided for comparison.

pub mod algo;
pub mod corner;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod naive;
pub mod posterior;
pub mod sampler;

// Re-exports for easier access
pub use corner::CornerPlot;
pub use data::LuminosityData;
pub use diagnostics::{FitSummary, ParameterSummary};
pub use error::{InferenceError, Result};
pub use model::{LuminosityModel, MagnitudeLimitedModel, VolumeCompleteModel};
pub use naive::{naive_luminosity_estimate, NaiveEstimate};
pub use posterior::PosteriorSamples;
pub use sampler::{MetropolisWithinGibbs, SamplerConfig};

/// Sample a model and summarise the draws
pub fn fit<M: LuminosityModel>(
    model: &M,
    config: SamplerConfig,
) -> Result<(PosteriorSamples, FitSummary)> {
    let samples = MetropolisWithinGibbs::new(config).run(model)?;
    let summary = FitSummary::from_samples(model.name(), &samples);
    Ok((samples, summary))
}
