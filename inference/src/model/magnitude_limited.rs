//! Model for a survey limited in apparent magnitude

use super::{initial_distance, initial_hyper_from_stars, Hyper, LuminosityModel, ModelState, Star};
use super::MEAN_ABS_MAG_PRIOR;
use crate::algo::integrate::simpson;
use crate::algo::stats::normal_cdf;
use crate::data::LuminosityData;
use crate::error::{InferenceError, Result};
use log::debug;
use parallax_surveys::distance_modulus;
use rand::Rng;

/// Simpson intervals for the selection probability integral over distance
pub const SELECTION_INTEGRATION_INTERVALS: usize = 400;

/// Initial apparent magnitudes stay this far inside the survey limit
const LIMIT_MARGIN: f64 = 1e-6;

/// Luminosity model for stars selected by true apparent magnitude
#[derive(Debug, Clone)]
pub struct MagnitudeLimitedModel {
    data: LuminosityData,
    survey_limit: f64,
}

impl MagnitudeLimitedModel {
    /// Requires `data.survey_limit` to be set
    pub fn new(data: LuminosityData) -> Result<Self> {
        data.validate()?;
        let survey_limit = data
            .survey_limit
            .filter(|m| m.is_finite())
            .ok_or(InferenceError::MissingSurveyLimit)?;
        Ok(Self { data, survey_limit })
    }

    pub fn survey_limit(&self) -> f64 {
        self.survey_limit
    }

    /// Faintest absolute magnitude still visible at the outer distance
    pub fn max_possible_abs_mag(&self) -> f64 {
        self.survey_limit - distance_modulus(self.data.max_dist)
    }

    /// Probability that a random star of the population is brighter than the limit
    ///
    /// Integrates `r^2 Phi((mlim - 5 log10 r + 5 - mu) / sigma)` over the
    /// distance range, normalised by the volume.
    pub fn selection_probability(&self, hyper: &Hyper) -> f64 {
        let (rmin, rmax) = (self.data.min_dist, self.data.max_dist);
        let volume = (rmax.powi(3) - rmin.powi(3)) / 3.0;
        let integrand = |r: f64| {
            let z = (self.survey_limit - distance_modulus(r) - hyper.mean_abs_mag)
                / hyper.sigma_abs_mag;
            r * r * normal_cdf(z)
        };
        simpson(integrand, rmin, rmax, SELECTION_INTEGRATION_INTERVALS) / volume
    }
}

impl LuminosityModel for MagnitudeLimitedModel {
    fn name(&self) -> &'static str {
        "luminosity inference, distance prior, magnitude limited"
    }

    fn data(&self) -> &LuminosityData {
        &self.data
    }

    fn ln_selection_probability(&self, hyper: &Hyper) -> f64 {
        let p = self.selection_probability(hyper);
        if p > 0.0 {
            p.ln()
        } else {
            f64::NEG_INFINITY
        }
    }

    fn star_in_support(&self, star: &Star) -> bool {
        star.dist >= self.data.min_dist
            && star.dist <= self.data.max_dist
            && star.app_mag() <= self.survey_limit
    }

    /// Stars start near their observations, clipped inside the survey limit;
    /// the population mean starts in the four magnitudes below the faintest
    /// absolute magnitude visible throughout the volume.
    fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelState {
        // Stars start on their observations, only the population mean is
        // drawn below the faintest visible absolute magnitude
        let stars: Vec<Star> = (0..self.data.len())
            .map(|i| {
                let dist = initial_distance(&self.data, i, rng);
                let app_mag = (self.data.obs_mag[i]
                    + self.data.err_mag[i] * rng.gen_range(-1.0..1.0))
                .min(self.survey_limit - LIMIT_MARGIN);
                Star::from_apparent(dist, app_mag)
            })
            .collect();

        let mut hyper = initial_hyper_from_stars(&stars, rng);
        let (lo, hi) = MEAN_ABS_MAG_PRIOR;
        let upper = self.max_possible_abs_mag().clamp(lo + 4.0, hi);
        hyper.mean_abs_mag = rng.gen_range((upper - 4.0)..upper);
        debug!(
            "Initial meanAbsMag {:.2} drawn below {:.2}",
            hyper.mean_abs_mag, upper
        );
        ModelState { hyper, stars }
    }
}
