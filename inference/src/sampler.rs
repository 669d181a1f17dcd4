//! Adaptive Metropolis-within-Gibbs sampler for the luminosity models
//!
//! Every iteration sweeps the stars and then the hyper parameters, updating
//! one coordinate at a time with a Gaussian random walk. A star first moves
//! in distance while its true apparent magnitude stays fixed, then in
//! apparent magnitude at fixed distance. With precise photometry the
//! posterior of `(dist, absMag)` is a thin ridge along constant apparent
//! magnitude; moving along it keeps the chains mixing. The change of
//! variables from `(dist, absMag)` to `(dist, appMag)` has unit Jacobian, so
//! no correction enters the acceptance ratio.
//!
//! Proposal scales adapt during warmup in batches. Chains run in parallel,
//! each with its own deterministically seeded RNG.

use crate::error::{InferenceError, Result};
use crate::model::{Hyper, LuminosityModel, ModelState, Star, HYPER_PARAMETER_NAMES};
use crate::posterior::{ChainAcceptance, PosteriorSamples};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;

/// Iterations between proposal scale adaptations during warmup
pub const ADAPTATION_BATCH: usize = 50;

/// Acceptance rate the adaptation steers each coordinate towards
pub const TARGET_ACCEPTANCE: f64 = 0.44;

/// Attempts at drawing a starting state with finite density
pub const MAX_INIT_ATTEMPTS: usize = 100;

/// Settings of a sampling run
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Iterations per chain, warmup included
    pub iterations: usize,
    /// Warmup iterations per chain, half of `iterations` when unset
    pub warmup: Option<usize>,
    /// Keep every `thin`-th post-warmup iteration
    pub thin: usize,
    pub chains: usize,
    /// Base seed; chain `c` uses `seed + c`. Drawn from the OS when unset
    pub seed: Option<u64>,
    pub show_progress: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            warmup: None,
            thin: 5,
            chains: 4,
            seed: None,
            show_progress: true,
        }
    }
}

impl SamplerConfig {
    pub fn warmup_iterations(&self) -> usize {
        self.warmup.unwrap_or(self.iterations / 2)
    }

    /// Retained draws per chain
    pub fn draws_per_chain(&self) -> usize {
        self.iterations
            .saturating_sub(self.warmup_iterations())
            .div_ceil(self.thin.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.chains == 0 {
            return Err(InferenceError::InvalidSamplerConfig(
                "at least one chain is required".to_string(),
            ));
        }
        if self.thin == 0 {
            return Err(InferenceError::InvalidSamplerConfig(
                "thin must be at least 1".to_string(),
            ));
        }
        let warmup = self.warmup_iterations();
        if self.iterations <= warmup {
            return Err(InferenceError::InvalidSamplerConfig(format!(
                "iterations ({}) must exceed warmup ({})",
                self.iterations, warmup
            )));
        }
        Ok(())
    }
}

/// Random walk proposal scale tuned on the log scale
#[derive(Debug, Clone)]
struct AdaptiveStep {
    log_scale: f64,
    batch_accepted: usize,
    batch_trials: usize,
    batches: usize,
    accepted: usize,
    trials: usize,
}

impl AdaptiveStep {
    fn new(scale: f64) -> Self {
        Self {
            log_scale: scale.ln(),
            batch_accepted: 0,
            batch_trials: 0,
            batches: 0,
            accepted: 0,
            trials: 0,
        }
    }

    fn scale(&self) -> f64 {
        self.log_scale.exp()
    }

    fn record(&mut self, accepted: bool) {
        self.batch_trials += 1;
        self.trials += 1;
        if accepted {
            self.batch_accepted += 1;
            self.accepted += 1;
        }
    }

    /// Nudge the scale after a batch; the nudge shrinks as batches accumulate
    fn adapt(&mut self) {
        if self.batch_trials == 0 {
            return;
        }
        let rate = self.batch_accepted as f64 / self.batch_trials as f64;
        let delta = 1.0 / ((self.batches + 1) as f64).sqrt();
        if rate > TARGET_ACCEPTANCE {
            self.log_scale += delta;
        } else {
            self.log_scale -= delta;
        }
        self.batches += 1;
        self.batch_accepted = 0;
        self.batch_trials = 0;
    }

    fn reset_counts(&mut self) {
        self.accepted = 0;
        self.trials = 0;
        self.batch_accepted = 0;
        self.batch_trials = 0;
    }

    fn acceptance_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.accepted as f64 / self.trials as f64
        }
    }
}

/// One Metropolis update of a scalar coordinate
///
/// Returns the new value and its log density.
fn metropolis_step<R, F>(
    rng: &mut R,
    current: f64,
    current_lp: f64,
    step: &mut AdaptiveStep,
    log_density: F,
) -> (f64, f64)
where
    R: Rng + ?Sized,
    F: Fn(f64) -> f64,
{
    let z: f64 = StandardNormal.sample(rng);
    let proposal = current + step.scale() * z;
    let lp = log_density(proposal);
    let accept = lp.is_finite()
        && (lp >= current_lp || rng.gen::<f64>().ln() < lp - current_lp);
    step.record(accept);
    if accept {
        (proposal, lp)
    } else {
        (current, current_lp)
    }
}

/// Proposal scales for one star: distance and apparent magnitude
#[derive(Debug, Clone)]
struct StarSteps {
    dist: AdaptiveStep,
    app_mag: AdaptiveStep,
}

struct ChainOutput {
    draws: Array2<f64>,
    acceptance: ChainAcceptance,
}

/// State of a single chain
struct Chain<'a, M: LuminosityModel> {
    model: &'a M,
    state: ModelState,
    star_steps: Vec<StarSteps>,
    mean_step: AdaptiveStep,
    sigma_step: AdaptiveStep,
}

impl<'a, M: LuminosityModel> Chain<'a, M> {
    fn new<R: Rng + ?Sized>(model: &'a M, index: usize, rng: &mut R) -> Result<Self> {
        let state = (0..MAX_INIT_ATTEMPTS)
            .map(|_| model.initial_state(rng))
            .find(|s| model.log_density(s).is_finite())
            .ok_or(InferenceError::Initialisation {
                chain: index,
                attempts: MAX_INIT_ATTEMPTS,
            })?;

        let data = model.data();
        let width = data.max_dist - data.min_dist;
        let star_steps = (0..data.len())
            .map(|i| {
                // Distance error from the parallax error: dr = r^2 dplx / 1000
                let r = state.stars[i].dist;
                let dist_scale =
                    (r * r * data.err_plx[i] / 1000.0).clamp(1e-3 * width, 0.25 * width);
                StarSteps {
                    dist: AdaptiveStep::new(dist_scale),
                    app_mag: AdaptiveStep::new(data.err_mag[i]),
                }
            })
            .collect();

        Ok(Self {
            model,
            state,
            star_steps,
            mean_step: AdaptiveStep::new(0.1),
            sigma_step: AdaptiveStep::new(0.05),
        })
    }

    fn update_stars<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let model = self.model;
        let hyper = self.state.hyper;
        for (i, (star, steps)) in self
            .state
            .stars
            .iter_mut()
            .zip(self.star_steps.iter_mut())
            .enumerate()
        {
            let lp = model.star_log_density(i, star, &hyper);

            let app_mag = star.app_mag();
            let (dist, lp) = metropolis_step(rng, star.dist, lp, &mut steps.dist, |d| {
                model.star_log_density(i, &Star::from_apparent(d, app_mag), &hyper)
            });
            *star = Star::from_apparent(dist, app_mag);

            let (app_mag, _) = metropolis_step(rng, app_mag, lp, &mut steps.app_mag, |m| {
                model.star_log_density(i, &Star::from_apparent(dist, m), &hyper)
            });
            *star = Star::from_apparent(dist, app_mag);
        }
    }

    fn update_hyper<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let model = self.model;
        let stars = &self.state.stars;
        let hyper = self.state.hyper;
        let lp = model.hyper_log_density(&hyper, stars);

        let with_mean = |mu: f64| Hyper {
            mean_abs_mag: mu,
            ..hyper
        };
        let (mean_abs_mag, lp) =
            metropolis_step(rng, hyper.mean_abs_mag, lp, &mut self.mean_step, |mu| {
                model.hyper_log_density(&with_mean(mu), stars)
            });

        let with_sigma = |sigma: f64| Hyper {
            mean_abs_mag,
            sigma_abs_mag: sigma,
        };
        let (sigma_abs_mag, _) =
            metropolis_step(rng, hyper.sigma_abs_mag, lp, &mut self.sigma_step, |sigma| {
                model.hyper_log_density(&with_sigma(sigma), stars)
            });
        self.state.hyper = Hyper {
            mean_abs_mag,
            sigma_abs_mag,
        };
    }

    fn adapt(&mut self) {
        self.mean_step.adapt();
        self.sigma_step.adapt();
        for steps in &mut self.star_steps {
            steps.dist.adapt();
            steps.app_mag.adapt();
        }
    }

    fn reset_counts(&mut self) {
        self.mean_step.reset_counts();
        self.sigma_step.reset_counts();
        for steps in &mut self.star_steps {
            steps.dist.reset_counts();
            steps.app_mag.reset_counts();
        }
    }

    fn acceptance(&self) -> ChainAcceptance {
        let hyper = 0.5 * (self.mean_step.acceptance_rate() + self.sigma_step.acceptance_rate());
        let stars = if self.star_steps.is_empty() {
            0.0
        } else {
            self.star_steps
                .iter()
                .map(|s| 0.5 * (s.dist.acceptance_rate() + s.app_mag.acceptance_rate()))
                .sum::<f64>()
                / self.star_steps.len() as f64
        };
        ChainAcceptance { hyper, stars }
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {prefix} {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Metropolis-within-Gibbs sampler over a [`LuminosityModel`]
#[derive(Debug, Clone, Default)]
pub struct MetropolisWithinGibbs {
    config: SamplerConfig,
}

impl MetropolisWithinGibbs {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Run all chains and collect the thinned post-warmup hyper parameter draws
    pub fn run<M: LuminosityModel>(&self, model: &M) -> Result<PosteriorSamples> {
        let config = &self.config;
        config.validate()?;
        model.data().validate()?;

        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().next_u64());
        let warmup = config.warmup_iterations();
        info!(
            "Sampling {} with {} chains: {} iterations, {} warmup, thin {}, seed {}",
            model.name(),
            config.chains,
            config.iterations,
            warmup,
            config.thin,
            seed
        );

        let multi = MultiProgress::new();
        if !config.show_progress {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }

        let outputs = (0..config.chains)
            .into_par_iter()
            .map(|c| {
                let bar = multi.add(ProgressBar::new(config.iterations as u64));
                bar.set_style(progress_style());
                bar.set_prefix(format!("chain {c}"));
                let output = self.run_chain(model, c, seed.wrapping_add(c as u64), &bar);
                bar.finish_with_message("done");
                output
            })
            .collect::<Result<Vec<_>>>()?;

        let n_draws = config.draws_per_chain();
        let mut draws = Array3::zeros((config.chains, n_draws, HYPER_PARAMETER_NAMES.len()));
        let mut acceptance = Vec::with_capacity(config.chains);
        for (c, output) in outputs.into_iter().enumerate() {
            draws.index_axis_mut(Axis(0), c).assign(&output.draws);
            info!(
                "Chain {}: acceptance hyper {:.2}, stars {:.2}",
                c, output.acceptance.hyper, output.acceptance.stars
            );
            acceptance.push(output.acceptance);
        }

        Ok(PosteriorSamples {
            names: HYPER_PARAMETER_NAMES.iter().map(|n| n.to_string()).collect(),
            draws,
            iterations: config.iterations,
            warmup,
            thin: config.thin,
            seed,
            acceptance,
        })
    }

    fn run_chain<M: LuminosityModel>(
        &self,
        model: &M,
        index: usize,
        seed: u64,
        bar: &ProgressBar,
    ) -> Result<ChainOutput> {
        let config = &self.config;
        let warmup = config.warmup_iterations();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut chain = Chain::new(model, index, &mut rng)?;
        debug!(
            "Chain {}: start meanAbsMag {:.3}, sigmaAbsMag {:.3}",
            index, chain.state.hyper.mean_abs_mag, chain.state.hyper.sigma_abs_mag
        );

        let mut draws = Array2::zeros((config.draws_per_chain(), HYPER_PARAMETER_NAMES.len()));
        let mut kept = 0;
        for iter in 0..config.iterations {
            chain.update_stars(&mut rng);
            chain.update_hyper(&mut rng);

            if iter < warmup {
                if (iter + 1) % ADAPTATION_BATCH == 0 {
                    chain.adapt();
                }
                if iter + 1 == warmup {
                    debug!(
                        "Chain {}: warmup done, hyper scales {:.4} / {:.4}",
                        index,
                        chain.mean_step.scale(),
                        chain.sigma_step.scale()
                    );
                    chain.reset_counts();
                }
            } else if (iter - warmup) % config.thin == 0 {
                let hyper = chain.state.hyper.as_array();
                draws.row_mut(kept).assign(&ndarray::aview1(&hyper));
                kept += 1;
            }
            bar.inc(1);
        }

        Ok(ChainOutput {
            draws,
            acceptance: chain.acceptance(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LuminosityData;
    use crate::model::VolumeCompleteModel;
    use approx::assert_relative_eq;
    use parallax_surveys::SurveyConfig;

    fn quick_config(seed: u64) -> SamplerConfig {
        SamplerConfig {
            iterations: 1_500,
            warmup: None,
            thin: 2,
            chains: 2,
            seed: Some(seed),
            show_progress: false,
        }
    }

    fn volume_complete_model() -> VolumeCompleteModel {
        // Within 20 pc practically every star is brighter than the catalogue limit
        let survey = test_helpers::survey_from(
            SurveyConfig {
                number_of_stars: 40,
                max_distance: 20.0,
                ..SurveyConfig::default()
            },
            11,
        );
        let data = LuminosityData::from_survey(&survey, true).unwrap();
        VolumeCompleteModel::new(data).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.warmup_iterations(), 5_000);
        assert_eq!(config.thin, 5);
        assert_eq!(config.chains, 4);
        assert_eq!(config.draws_per_chain(), 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_draws_per_chain_rounds_up() {
        let config = SamplerConfig {
            iterations: 11,
            warmup: Some(4),
            thin: 3,
            ..SamplerConfig::default()
        };
        // post-warmup iterations 4, 7 and 10 are kept
        assert_eq!(config.draws_per_chain(), 3);
    }

    #[test]
    fn test_config_validation() {
        for bad in [
            SamplerConfig {
                chains: 0,
                ..SamplerConfig::default()
            },
            SamplerConfig {
                thin: 0,
                ..SamplerConfig::default()
            },
            SamplerConfig {
                iterations: 100,
                warmup: Some(100),
                ..SamplerConfig::default()
            },
        ] {
            assert!(matches!(
                bad.validate(),
                Err(InferenceError::InvalidSamplerConfig(_))
            ));
        }
    }

    #[test]
    fn test_adaptive_step_grows_when_everything_is_accepted() {
        let mut step = AdaptiveStep::new(1.0);
        for _ in 0..ADAPTATION_BATCH {
            step.record(true);
        }
        step.adapt();
        assert_relative_eq!(step.scale(), 1f64.exp(), epsilon = 1e-12);

        for _ in 0..ADAPTATION_BATCH {
            step.record(false);
        }
        step.adapt();
        assert!(step.scale() < 1f64.exp());
        assert_relative_eq!(step.acceptance_rate(), 0.5);

        step.reset_counts();
        assert_eq!(step.acceptance_rate(), 0.0);
    }

    #[test]
    fn test_metropolis_step_never_accepts_outside_support() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut step = AdaptiveStep::new(1.0);
        let (x, lp) = metropolis_step(&mut rng, 0.5, 0.0, &mut step, |_| f64::NEG_INFINITY);
        assert_eq!(x, 0.5);
        assert_eq!(lp, 0.0);
        assert_eq!(step.acceptance_rate(), 0.0);
    }

    #[test]
    fn test_metropolis_step_samples_standard_normal() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut step = AdaptiveStep::new(2.4);
        let density = |x: f64| -0.5 * x * x;
        let (mut x, mut lp) = (0.0, 0.0);
        let mut values = Vec::new();
        for _ in 0..20_000 {
            (x, lp) = metropolis_step(&mut rng, x, lp, &mut step, density);
            values.push(x);
        }
        assert_relative_eq!(crate::algo::mean(&values), 0.0, epsilon = 0.1);
        assert_relative_eq!(crate::algo::std_dev(&values), 1.0, epsilon = 0.1);
    }

    #[test]
    fn test_run_shapes_and_reproducibility() {
        let model = volume_complete_model();
        let sampler = MetropolisWithinGibbs::new(quick_config(21));
        let first = sampler.run(&model).unwrap();
        assert_eq!(first.draws.dim(), (2, 375, 2));
        assert_eq!(first.names, vec!["meanAbsMag", "sigmaAbsMag"]);
        assert_eq!(first.seed, 21);
        assert_eq!(first.warmup, 750);
        assert_eq!(first.acceptance.len(), 2);
        assert!(first.draws.iter().all(|v| v.is_finite()));

        let second = sampler.run(&model).unwrap();
        assert_eq!(first.draws, second.draws);
    }

    #[test]
    fn test_run_recovers_population_mean() {
        let model = volume_complete_model();
        let samples = MetropolisWithinGibbs::new(quick_config(5)).run(&model).unwrap();

        let mu = samples.pooled("meanAbsMag").unwrap();
        assert_relative_eq!(crate::algo::mean(&mu), 9.0, epsilon = 0.6);
        let sigma = samples.pooled("sigmaAbsMag").unwrap();
        assert!(sigma.iter().all(|s| *s > 0.0));
        for acc in &samples.acceptance {
            assert!(acc.stars > 0.05 && acc.stars < 0.95);
            assert!(acc.hyper > 0.05 && acc.hyper < 0.95);
        }
    }

    /// Model whose selection probability is always zero
    struct Unsatisfiable(LuminosityData);

    impl LuminosityModel for Unsatisfiable {
        fn name(&self) -> &'static str {
            "unsatisfiable"
        }
        fn data(&self) -> &LuminosityData {
            &self.0
        }
        fn ln_selection_probability(&self, _hyper: &Hyper) -> f64 {
            f64::NEG_INFINITY
        }
        fn initial_state<R: Rng + ?Sized>(&self, _rng: &mut R) -> ModelState {
            ModelState {
                hyper: Hyper {
                    mean_abs_mag: 9.0,
                    sigma_abs_mag: 1.0,
                },
                stars: vec![Star::from_apparent(10.0, 9.0); self.0.len()],
            }
        }
    }

    #[test]
    fn test_initialisation_failure_is_reported() {
        let data = volume_complete_model().data().clone();
        let err = MetropolisWithinGibbs::new(quick_config(1))
            .run(&Unsatisfiable(data))
            .unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Initialisation {
                attempts: MAX_INIT_ATTEMPTS,
                ..
            }
        ));
    }
}
