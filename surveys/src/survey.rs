//! Parallax survey simulation
//!
//! A survey is generated in two steps: a population of stars is drawn
//! uniformly in a spherical shell around the observer with normally
//! distributed absolute magnitudes, then every star is "observed" by a
//! catalogue that adds Gaussian noise to its parallax and apparent magnitude.
//! Only stars whose true apparent magnitude is at or brighter than the
//! survey limit are kept, and only those are observed.

use crate::catalogue::Catalogue;
use crate::distance_modulus;
use crate::error::SurveyError;
use log::{debug, info};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

/// Parameters of a simulated survey
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyConfig {
    /// Number of stars simulated in the volume, before the magnitude cut
    pub number_of_stars: usize,
    /// Inner radius of the shell (pc)
    pub min_distance: f64,
    /// Outer radius of the shell (pc)
    pub max_distance: f64,
    /// Mean of the absolute magnitude distribution
    pub mean_absolute_magnitude: f64,
    /// Standard deviation of the absolute magnitude distribution
    pub stddev_absolute_magnitude: f64,
    /// Survey limiting magnitude, `None` for no limit beyond the catalogue's own
    pub survey_limit: Option<f64>,
    /// Catalogue providing the observational errors
    pub catalogue: Catalogue,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            number_of_stars: 50,
            min_distance: 1.0,
            max_distance: 100.0,
            mean_absolute_magnitude: 9.0,
            stddev_absolute_magnitude: 0.7,
            survey_limit: None,
            catalogue: Catalogue::Hipparcos,
        }
    }
}

impl SurveyConfig {
    /// Check the parameters describe a proper survey
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.number_of_stars == 0 {
            return Err(SurveyError::NoStars);
        }
        let (min, max) = (self.min_distance, self.max_distance);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min < max) {
            return Err(SurveyError::InvalidDistanceRange { min, max });
        }
        let (mean, sigma) = (
            self.mean_absolute_magnitude,
            self.stddev_absolute_magnitude,
        );
        if !(mean.is_finite() && sigma.is_finite() && sigma > 0.0) {
            return Err(SurveyError::InvalidMagnitudeDistribution { mean, sigma });
        }
        if self.survey_limit.is_some_and(f64::is_nan) {
            return Err(SurveyError::InvalidSurveyLimit);
        }
        Ok(())
    }

    /// Effective apparent magnitude limit, never fainter than the catalogue allows
    pub fn apparent_magnitude_limit(&self) -> f64 {
        self.survey_limit
            .unwrap_or(f64::INFINITY)
            .min(self.catalogue.magnitude_limit())
    }

}

/// Result of a simulated survey
///
/// All arrays have one entry per surveyed star, in generation order.
#[derive(Debug, Clone)]
pub struct ParallaxSurvey {
    /// Configuration the survey was generated from
    pub config: SurveyConfig,
    /// Seed of the random number generator used
    pub seed: u64,
    /// Number of stars simulated before the magnitude cut
    pub number_of_stars_simulated: usize,
    /// Effective apparent magnitude limit applied
    pub apparent_magnitude_limit: f64,
    pub true_distances: Array1<f64>,
    pub true_parallaxes: Array1<f64>,
    pub absolute_magnitudes: Array1<f64>,
    pub apparent_magnitudes: Array1<f64>,
    pub observed_parallaxes: Array1<f64>,
    pub parallax_errors: Array1<f64>,
    pub observed_magnitudes: Array1<f64>,
    pub magnitude_errors: Array1<f64>,
}

impl ParallaxSurvey {
    /// Number of stars that made it into the survey
    pub fn number_of_stars_in_survey(&self) -> usize {
        self.observed_parallaxes.len()
    }

    /// Relative parallax errors `sigma / parallax` of the observed parallaxes
    pub fn relative_parallax_errors(&self) -> Array1<f64> {
        &self.parallax_errors / &self.observed_parallaxes
    }
}

/// Per-star values collected during generation
#[derive(Default)]
struct Columns {
    true_distances: Vec<f64>,
    true_parallaxes: Vec<f64>,
    absolute_magnitudes: Vec<f64>,
    apparent_magnitudes: Vec<f64>,
    observed_parallaxes: Vec<f64>,
    parallax_errors: Vec<f64>,
    observed_magnitudes: Vec<f64>,
    magnitude_errors: Vec<f64>,
}

/// Stars of a single luminosity class, uniformly distributed in space
#[derive(Debug, Clone)]
pub struct UniformSpaceSingleLuminosity {
    config: SurveyConfig,
}

impl UniformSpaceSingleLuminosity {
    /// Create a generator after validating its configuration
    pub fn new(config: SurveyConfig) -> Result<Self, SurveyError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Draw a distance with density proportional to r^2 inside the shell
    fn draw_distance<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let rmin3 = self.config.min_distance.powi(3);
        let rmax3 = self.config.max_distance.powi(3);
        let u: f64 = rng.gen();
        (rmin3 + u * (rmax3 - rmin3)).cbrt()
    }

    /// Generate a survey with a seeded generator
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed for a `StdRng`. When `None` a seed is drawn from the
    ///   thread RNG, so every run differs.
    ///
    /// # Returns
    ///
    /// The survey with the seed used recorded in it, or
    /// `SurveyError::EmptySurvey` when no star is bright enough.
    pub fn generate_with_seed(&self, seed: Option<u64>) -> Result<ParallaxSurvey, SurveyError> {
        let seed = seed.unwrap_or_else(|| thread_rng().next_u64());
        let mut rng = StdRng::seed_from_u64(seed);
        let mut survey = self.generate(&mut rng)?;
        survey.seed = seed;
        Ok(survey)
    }

    /// Generate a survey from the given random number generator
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParallaxSurvey, SurveyError> {
        let config = &self.config;
        let limit = config.apparent_magnitude_limit();
        let luminosity = Normal::new(
            config.mean_absolute_magnitude,
            config.stddev_absolute_magnitude,
        )
        .map_err(|_| SurveyError::InvalidMagnitudeDistribution {
            mean: config.mean_absolute_magnitude,
            sigma: config.stddev_absolute_magnitude,
        })?;

        let mut columns = Columns::default();
        for _ in 0..config.number_of_stars {
            let distance = self.draw_distance(rng);
            let parallax = 1000.0 / distance;
            let absolute_mag = luminosity.sample(rng);
            let apparent_mag = absolute_mag + distance_modulus(distance);
            if apparent_mag > limit {
                continue;
            }

            let parallax_error = config.catalogue.parallax_error(apparent_mag);
            let magnitude_error = config.catalogue.magnitude_error(apparent_mag);
            let z_parallax: f64 = StandardNormal.sample(rng);
            let z_mag: f64 = StandardNormal.sample(rng);
            let observed_parallax = parallax + parallax_error * z_parallax;
            let observed_mag = apparent_mag + magnitude_error * z_mag;

            columns.true_distances.push(distance);
            columns.true_parallaxes.push(parallax);
            columns.absolute_magnitudes.push(absolute_mag);
            columns.apparent_magnitudes.push(apparent_mag);
            columns.observed_parallaxes.push(observed_parallax);
            columns.parallax_errors.push(parallax_error);
            columns.observed_magnitudes.push(observed_mag);
            columns.magnitude_errors.push(magnitude_error);
        }

        let surveyed = columns.observed_parallaxes.len();
        debug!(
            "{} of {} simulated stars brighter than m = {:.2}",
            surveyed, config.number_of_stars, limit
        );
        if surveyed == 0 {
            return Err(SurveyError::EmptySurvey {
                limit,
                simulated: config.number_of_stars,
            });
        }
        info!(
            "Generated {} survey: {} stars between {} and {} pc",
            config.catalogue, surveyed, config.min_distance, config.max_distance
        );

        Ok(ParallaxSurvey {
            config: config.clone(),
            seed: 0,
            number_of_stars_simulated: config.number_of_stars,
            apparent_magnitude_limit: limit,
            true_distances: Array1::from(columns.true_distances),
            true_parallaxes: Array1::from(columns.true_parallaxes),
            absolute_magnitudes: Array1::from(columns.absolute_magnitudes),
            apparent_magnitudes: Array1::from(columns.apparent_magnitudes),
            observed_parallaxes: Array1::from(columns.observed_parallaxes),
            parallax_errors: Array1::from(columns.parallax_errors),
            observed_magnitudes: Array1::from(columns.observed_magnitudes),
            magnitude_errors: Array1::from(columns.magnitude_errors),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(number_of_stars: usize) -> SurveyConfig {
        SurveyConfig {
            number_of_stars,
            ..SurveyConfig::default()
        }
    }

    #[test]
    fn test_validate_rejects_bad_distances() {
        for (min, max) in [(0.0, 10.0), (10.0, 10.0), (20.0, 10.0), (-1.0, 5.0)] {
            let cfg = SurveyConfig {
                min_distance: min,
                max_distance: max,
                ..SurveyConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(SurveyError::InvalidDistanceRange { .. })
            ));
        }
    }

    #[test]
    fn test_validate_rejects_bad_population() {
        assert!(matches!(config(0).validate(), Err(SurveyError::NoStars)));

        let cfg = SurveyConfig {
            stddev_absolute_magnitude: 0.0,
            ..SurveyConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(SurveyError::InvalidMagnitudeDistribution { .. })
        ));

        let cfg = SurveyConfig {
            survey_limit: Some(f64::NAN),
            ..SurveyConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(SurveyError::InvalidSurveyLimit)));
    }

    #[test]
    fn test_effective_limit_capped_by_catalogue() {
        let cfg = SurveyConfig::default();
        assert_eq!(cfg.apparent_magnitude_limit(), 12.4);

        let cfg = SurveyConfig {
            survey_limit: Some(10.0),
            ..SurveyConfig::default()
        };
        assert_eq!(cfg.apparent_magnitude_limit(), 10.0);

        let cfg = SurveyConfig {
            survey_limit: Some(20.0),
            catalogue: Catalogue::Tgas,
            ..SurveyConfig::default()
        };
        assert_eq!(cfg.apparent_magnitude_limit(), 13.0);
    }

    #[test]
    fn test_generated_stars_respect_limits() {
        let generator = UniformSpaceSingleLuminosity::new(SurveyConfig {
            number_of_stars: 2000,
            survey_limit: Some(11.0),
            ..SurveyConfig::default()
        })
        .unwrap();
        let survey = generator.generate_with_seed(Some(42)).unwrap();

        assert_eq!(survey.seed, 42);
        assert_eq!(survey.number_of_stars_simulated, 2000);
        let n = survey.number_of_stars_in_survey();
        assert!(n > 0 && n < 2000, "magnitude cut should remove some stars");
        assert_eq!(survey.true_distances.len(), n);
        assert_eq!(survey.magnitude_errors.len(), n);

        for &m in survey.apparent_magnitudes.iter() {
            assert!(m <= 11.0);
        }
        // Photometric noise at the limit is about 0.01 mag
        for &m in survey.observed_magnitudes.iter() {
            assert!(m < 11.1, "{m}");
        }
        for &r in survey.true_distances.iter() {
            assert!((1.0..=100.0).contains(&r));
        }
        for i in 0..n {
            assert_relative_eq!(
                survey.true_parallaxes[i],
                1000.0 / survey.true_distances[i],
                epsilon = 1e-9
            );
            assert_relative_eq!(
                survey.apparent_magnitudes[i],
                survey.absolute_magnitudes[i] + distance_modulus(survey.true_distances[i]),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_same_seed_same_survey() {
        let generator = UniformSpaceSingleLuminosity::new(config(100)).unwrap();
        let a = generator.generate_with_seed(Some(7)).unwrap();
        let b = generator.generate_with_seed(Some(7)).unwrap();
        let c = generator.generate_with_seed(Some(8)).unwrap();
        assert_eq!(a.observed_parallaxes, b.observed_parallaxes);
        assert_ne!(a.observed_parallaxes, c.observed_parallaxes);
    }

    #[test]
    fn test_distances_uniform_in_volume() {
        // For r^2 density on [1, 100] the median is near 100 * 0.5^(1/3)
        let generator = UniformSpaceSingleLuminosity::new(SurveyConfig {
            number_of_stars: 20000,
            catalogue: Catalogue::Tgas,
            mean_absolute_magnitude: 0.0,
            ..SurveyConfig::default()
        })
        .unwrap();
        let survey = generator.generate_with_seed(Some(3)).unwrap();
        assert_eq!(survey.number_of_stars_in_survey(), 20000);

        let mut distances = survey.true_distances.to_vec();
        distances.sort_by(|a, b| a.total_cmp(b));
        let median = distances[distances.len() / 2];
        assert_relative_eq!(median, 100.0 * 0.5f64.cbrt(), epsilon = 1.0);
    }

    #[test]
    fn test_empty_survey_is_an_error() {
        // Absolute magnitude 30 stars are never brighter than m = 12.4 beyond 1 pc
        for seed in [1, 2, 3] {
            let generator = UniformSpaceSingleLuminosity::new(SurveyConfig {
                mean_absolute_magnitude: 30.0,
                ..SurveyConfig::default()
            })
            .unwrap();
            assert!(matches!(
                generator.generate_with_seed(Some(seed)),
                Err(SurveyError::EmptySurvey { simulated: 50, .. })
            ));
        }
    }

    #[test]
    fn test_faint_stars_never_enter_on_noise() {
        // Most of this population sits far below the limit where catalogue
        // errors are huge; none of it may leak into the survey
        let generator = UniformSpaceSingleLuminosity::new(SurveyConfig {
            number_of_stars: 5000,
            mean_absolute_magnitude: 14.0,
            stddev_absolute_magnitude: 3.0,
            ..SurveyConfig::default()
        })
        .unwrap();
        let survey = generator.generate_with_seed(Some(1)).unwrap();
        assert!(survey.number_of_stars_in_survey() > 0);
        for i in 0..survey.number_of_stars_in_survey() {
            assert!(survey.apparent_magnitudes[i] <= 12.4);
            assert!(survey.magnitude_errors[i] < 0.03);
            assert!(survey.parallax_errors[i] < 7.0);
        }
    }
}
