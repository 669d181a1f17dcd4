//! Summary statistics of a simulated survey

use crate::survey::ParallaxSurvey;
use std::fmt;

/// Relative parallax error at or below which a parallax counts as "good"
pub const GOOD_RELATIVE_PARALLAX_ERROR: f64 = 0.175;

/// Summary of the contents of a parallax survey
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyStatistics {
    pub simulated: usize,
    pub surveyed: usize,
    pub magnitude_limit: f64,
    pub negative_parallaxes: usize,
    pub median_relative_parallax_error: f64,
    pub good_parallaxes: usize,
    pub brightest_magnitude: f64,
    pub faintest_magnitude: f64,
}

impl SurveyStatistics {
    pub fn from_survey(survey: &ParallaxSurvey) -> Self {
        let negative_parallaxes = survey
            .observed_parallaxes
            .iter()
            .filter(|&&p| p <= 0.0)
            .count();

        // Relative errors of non-positive parallaxes are meaningless, rank them last
        let mut relative: Vec<f64> = survey
            .observed_parallaxes
            .iter()
            .zip(survey.parallax_errors.iter())
            .map(|(&p, &e)| if p > 0.0 { e / p } else { f64::INFINITY })
            .collect();
        let good_parallaxes = relative
            .iter()
            .filter(|&&r| r <= GOOD_RELATIVE_PARALLAX_ERROR)
            .count();
        relative.sort_by(|a, b| a.total_cmp(b));
        let median_relative_parallax_error = if relative.is_empty() {
            f64::NAN
        } else if relative.len() % 2 == 0 {
            let mid = relative.len() / 2;
            (relative[mid - 1] + relative[mid]) / 2.0
        } else {
            relative[relative.len() / 2]
        };

        let brightest_magnitude = survey
            .observed_magnitudes
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let faintest_magnitude = survey
            .observed_magnitudes
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        Self {
            simulated: survey.number_of_stars_simulated,
            surveyed: survey.number_of_stars_in_survey(),
            magnitude_limit: survey.apparent_magnitude_limit,
            negative_parallaxes,
            median_relative_parallax_error,
            good_parallaxes,
            brightest_magnitude,
            faintest_magnitude,
        }
    }

    /// Fraction of surveyed stars with a non-positive observed parallax
    pub fn negative_parallax_fraction(&self) -> f64 {
        if self.surveyed == 0 {
            return 0.0;
        }
        self.negative_parallaxes as f64 / self.surveyed as f64
    }
}

impl fmt::Display for SurveyStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Stars in survey: {}/{} (m <= {:.2})",
            self.surveyed, self.simulated, self.magnitude_limit
        )?;
        writeln!(
            f,
            "Observed magnitude range: {:.2} .. {:.2}",
            self.brightest_magnitude, self.faintest_magnitude
        )?;
        writeln!(
            f,
            "Non-positive parallaxes: {} ({:.1}%)",
            self.negative_parallaxes,
            100.0 * self.negative_parallax_fraction()
        )?;
        writeln!(
            f,
            "Median relative parallax error: {:.3}",
            self.median_relative_parallax_error
        )?;
        write!(
            f,
            "Parallaxes with relative error <= {}: {}",
            GOOD_RELATIVE_PARALLAX_ERROR, self.good_parallaxes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::{SurveyConfig, UniformSpaceSingleLuminosity};
    use crate::Catalogue;
    use ndarray::array;

    fn survey_with(parallaxes: ndarray::Array1<f64>, errors: ndarray::Array1<f64>) -> ParallaxSurvey {
        let n = parallaxes.len();
        let mags = ndarray::Array1::linspace(5.0, 9.0, n);
        ParallaxSurvey {
            config: SurveyConfig::default(),
            seed: 0,
            number_of_stars_simulated: 10,
            apparent_magnitude_limit: 12.4,
            true_distances: ndarray::Array1::ones(n),
            true_parallaxes: parallaxes.clone(),
            absolute_magnitudes: mags.clone(),
            apparent_magnitudes: mags.clone(),
            observed_parallaxes: parallaxes,
            parallax_errors: errors,
            observed_magnitudes: mags,
            magnitude_errors: ndarray::Array1::from_elem(n, 0.01),
        }
    }

    #[test]
    fn test_counts_and_median() {
        let survey = survey_with(array![10.0, 5.0, -1.0, 2.0], array![1.0, 1.0, 1.0, 1.0]);
        let stats = SurveyStatistics::from_survey(&survey);

        assert_eq!(stats.surveyed, 4);
        assert_eq!(stats.simulated, 10);
        assert_eq!(stats.negative_parallaxes, 1);
        assert_eq!(stats.negative_parallax_fraction(), 0.25);
        // Relative errors 0.1, 0.2, 0.5, inf
        assert_eq!(stats.good_parallaxes, 1);
        assert!((stats.median_relative_parallax_error - 0.35).abs() < 1e-12);
        assert_eq!(stats.brightest_magnitude, 5.0);
        assert_eq!(stats.faintest_magnitude, 9.0);
    }

    #[test]
    fn test_display_lists_counts() {
        let survey = survey_with(array![10.0, 5.0, 20.0], array![1.0, 1.0, 1.0]);
        let text = SurveyStatistics::from_survey(&survey).to_string();
        assert!(text.contains("Stars in survey: 3/10"));
        assert!(text.contains("Non-positive parallaxes: 0 (0.0%)"));
    }

    #[test]
    fn test_tgas_yields_more_good_parallaxes() {
        let base = SurveyConfig {
            number_of_stars: 500,
            ..SurveyConfig::default()
        };
        let hip = UniformSpaceSingleLuminosity::new(base.clone())
            .unwrap()
            .generate_with_seed(Some(11))
            .unwrap();
        let tgas = UniformSpaceSingleLuminosity::new(SurveyConfig {
            catalogue: Catalogue::Tgas,
            ..base
        })
        .unwrap()
        .generate_with_seed(Some(11))
        .unwrap();

        let hip_stats = SurveyStatistics::from_survey(&hip);
        let tgas_stats = SurveyStatistics::from_survey(&tgas);
        assert!(tgas_stats.good_parallaxes > hip_stats.good_parallaxes);
    }
}
