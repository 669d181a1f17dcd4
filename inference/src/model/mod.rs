//! Hierarchical models for the luminosity of a single class of stars
//!
//! Both models share the same structure. The population has hyper
//! parameters `meanAbsMag` and `sigmaAbsMag`; every star has a true distance
//! drawn uniformly in volume between `min_dist` and `max_dist` and a true
//! absolute magnitude drawn from `N(meanAbsMag, sigmaAbsMag)`. The observed
//! parallax is `N(1000 / dist, errObsPlx)` and the observed apparent
//! magnitude is `N(absMag + 5 log10 dist - 5, errObsMag)`.
//!
//! The models differ in how stars enter the survey. A volume complete survey
//! contains every star in the volume. A magnitude limited survey only contains
//! stars with a true apparent magnitude at or brighter than the survey limit,
//! so each star's population density is renormalised by the probability that
//! a random star of the population passes the limit.

pub mod magnitude_limited;
pub mod volume_complete;

pub use magnitude_limited::MagnitudeLimitedModel;
pub use volume_complete::VolumeCompleteModel;

use crate::algo::stats::{half_cauchy_ln_pdf, mean, normal_ln_pdf, std_dev};
use crate::data::LuminosityData;
use parallax_surveys::distance_modulus;
use rand::Rng;

/// Support of the uniform prior on `meanAbsMag`
pub const MEAN_ABS_MAG_PRIOR: (f64, f64) = (-10.0, 20.0);

/// Scale of the half-Cauchy prior on `sigmaAbsMag`
pub const SIGMA_ABS_MAG_PRIOR_SCALE: f64 = 1.0;

/// Names of the hyper parameters, in sample order
pub const HYPER_PARAMETER_NAMES: [&str; 2] = ["meanAbsMag", "sigmaAbsMag"];

/// Population hyper parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyper {
    pub mean_abs_mag: f64,
    pub sigma_abs_mag: f64,
}

impl Hyper {
    pub fn as_array(&self) -> [f64; 2] {
        [self.mean_abs_mag, self.sigma_abs_mag]
    }
}

/// Latent true parameters of one star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    /// True distance (pc)
    pub dist: f64,
    /// True absolute magnitude
    pub abs_mag: f64,
}

impl Star {
    /// Star at `dist` with true apparent magnitude `app_mag`
    pub fn from_apparent(dist: f64, app_mag: f64) -> Self {
        Self {
            dist,
            abs_mag: app_mag - distance_modulus(dist),
        }
    }

    /// True apparent magnitude
    pub fn app_mag(&self) -> f64 {
        self.abs_mag + distance_modulus(self.dist)
    }

    /// True parallax (mas)
    pub fn parallax(&self) -> f64 {
        1000.0 / self.dist
    }
}

/// Complete parameter vector of a model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    pub hyper: Hyper,
    pub stars: Vec<Star>,
}

/// A luminosity model the sampler can explore
///
/// Implementors describe the survey selection; the shared priors and the
/// measurement model are provided methods.
pub trait LuminosityModel: Sync {
    /// Short name used in logs and summaries
    fn name(&self) -> &'static str;

    fn data(&self) -> &LuminosityData;

    /// Log of the probability that a star of the population enters the survey
    fn ln_selection_probability(&self, hyper: &Hyper) -> f64;

    /// Whether a star's latent parameters satisfy the model's constraints
    fn star_in_support(&self, star: &Star) -> bool {
        let data = self.data();
        star.dist >= data.min_dist && star.dist <= data.max_dist
    }

    /// Starting point for a chain; must have a finite log density
    fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelState;

    /// Log prior of the hyper parameters, minus infinity outside the support
    fn ln_hyper_prior(&self, hyper: &Hyper) -> f64 {
        let (lo, hi) = MEAN_ABS_MAG_PRIOR;
        if !(hyper.mean_abs_mag >= lo && hyper.mean_abs_mag <= hi) || !(hyper.sigma_abs_mag > 0.0)
        {
            return f64::NEG_INFINITY;
        }
        -(hi - lo).ln() + half_cauchy_ln_pdf(hyper.sigma_abs_mag, SIGMA_ABS_MAG_PRIOR_SCALE)
    }

    /// Log density of the hyper parameters conditional on all stars
    fn hyper_log_density(&self, hyper: &Hyper, stars: &[Star]) -> f64 {
        let prior = self.ln_hyper_prior(hyper);
        if !prior.is_finite() {
            return f64::NEG_INFINITY;
        }
        let ln_selection = self.ln_selection_probability(hyper);
        if !ln_selection.is_finite() {
            return f64::NEG_INFINITY;
        }
        let population: f64 = stars
            .iter()
            .map(|s| normal_ln_pdf(s.abs_mag, hyper.mean_abs_mag, hyper.sigma_abs_mag))
            .sum();
        prior + population - stars.len() as f64 * ln_selection
    }

    /// Log density of star `index` conditional on the hyper parameters
    fn star_log_density(&self, index: usize, star: &Star, hyper: &Hyper) -> f64 {
        if !self.star_in_support(star) {
            return f64::NEG_INFINITY;
        }
        let data = self.data();
        // Uniform space density: p(r) ~ r^2
        2.0 * star.dist.ln()
            + normal_ln_pdf(star.abs_mag, hyper.mean_abs_mag, hyper.sigma_abs_mag)
            + normal_ln_pdf(data.obs_plx[index], star.parallax(), data.err_plx[index])
            + normal_ln_pdf(data.obs_mag[index], star.app_mag(), data.err_mag[index])
    }

    /// Unnormalised log posterior of a full state
    fn log_density(&self, state: &ModelState) -> f64 {
        let hyper = self.ln_hyper_prior(&state.hyper);
        if !hyper.is_finite() {
            return f64::NEG_INFINITY;
        }
        let ln_selection = self.ln_selection_probability(&state.hyper);
        if !ln_selection.is_finite() {
            return f64::NEG_INFINITY;
        }
        let stars: f64 = state
            .stars
            .iter()
            .enumerate()
            .map(|(i, s)| self.star_log_density(i, s, &state.hyper))
            .sum();
        hyper + stars - state.stars.len() as f64 * ln_selection
    }
}

/// Starting distance for star `index`: the inverted parallax, jittered and
/// kept inside the prior range
pub(crate) fn initial_distance<R: Rng + ?Sized>(
    data: &LuminosityData,
    index: usize,
    rng: &mut R,
) -> f64 {
    let plx = data.obs_plx[index];
    let guess = if plx > 0.0 {
        1000.0 / plx
    } else {
        data.max_dist
    };
    let jitter = 1.0 + rng.gen_range(-0.05..0.05);
    (guess * jitter).clamp(data.min_dist, data.max_dist)
}

/// Starting hyper parameters scattered around the spread of the stars' absolute magnitudes
pub(crate) fn initial_hyper_from_stars<R: Rng + ?Sized>(stars: &[Star], rng: &mut R) -> Hyper {
    let mags: Vec<f64> = stars.iter().map(|s| s.abs_mag).collect();
    let (lo, hi) = MEAN_ABS_MAG_PRIOR;
    let mean_abs_mag = (mean(&mags) + rng.gen_range(-0.5..0.5)).clamp(lo, hi);
    let spread = std_dev(&mags);
    let spread = if spread.is_finite() {
        spread.clamp(0.1, 5.0)
    } else {
        1.0
    };
    Hyper {
        mean_abs_mag,
        sigma_abs_mag: spread * rng.gen_range(0.8..1.25),
    }
}
