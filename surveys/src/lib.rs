//! Simulated astrometric parallax surveys
//!
//! This crate generates synthetic parallax surveys of a single luminosity
//! class of stars, distributed uniformly in space, as observed by a
//! simulated astrometric catalogue. The surveys feed the luminosity
//! calibration examples in `luminosity-inference`.

pub mod catalogue;
pub mod error;
pub mod plot;
pub mod statistics;
pub mod survey;

// Re-exports for easier access
pub use catalogue::Catalogue;
pub use error::SurveyError;
pub use plot::plot_survey_statistics;
pub use statistics::SurveyStatistics;
pub use survey::{ParallaxSurvey, SurveyConfig, UniformSpaceSingleLuminosity};

/// Convert a distance in parsec to the distance modulus `5 log10(r) - 5`
pub fn distance_modulus(distance_pc: f64) -> f64 {
    5.0 * distance_pc.log10() - 5.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_modulus_at_ten_parsec() {
        assert_relative_eq!(distance_modulus(10.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(distance_modulus(100.0), 5.0, epsilon = 1e-12);
        assert_relative_eq!(distance_modulus(1.0), -5.0, epsilon = 1e-12);
    }
}
