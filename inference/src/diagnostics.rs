//! Posterior summaries and convergence diagnostics
//!
//! Effective sample sizes combine the autocorrelation of all chains and
//! truncate the sum with Geyer's initial monotone positive sequence. R-hat is
//! the potential scale reduction computed on chains split in half.

use crate::algo::stats::{mean, quantile_sorted, variance};
use crate::posterior::PosteriorSamples;
use log::warn;
use ndarray::{ArrayView1, ArrayView2, Axis};
use std::fmt;

/// Quantiles reported for every parameter
pub const SUMMARY_QUANTILES: [f64; 5] = [0.025, 0.25, 0.5, 0.75, 0.975];

const QUANTILE_LABELS: [&str; 5] = ["2.5%", "25%", "50%", "75%", "97.5%"];

/// R-hat above this value is flagged as unconverged
pub const RHAT_WARNING_THRESHOLD: f64 = 1.1;

/// Summary statistics of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSummary {
    pub name: String,
    pub mean: f64,
    /// Monte Carlo standard error of the mean
    pub se_mean: f64,
    pub sd: f64,
    /// Values at [`SUMMARY_QUANTILES`]
    pub quantiles: [f64; 5],
    pub n_eff: f64,
    pub r_hat: f64,
}

impl ParameterSummary {
    /// Summarise draws laid out as (chains, draws per chain)
    pub fn from_draws(name: &str, draws: ArrayView2<'_, f64>) -> Self {
        let pooled: Vec<f64> = draws.iter().copied().collect();
        let mut sorted = pooled.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let sd = variance(&pooled, 1).sqrt();
        let n_eff = effective_sample_size(draws);
        Self {
            name: name.to_string(),
            mean: mean(&pooled),
            se_mean: sd / n_eff.sqrt(),
            sd,
            quantiles: SUMMARY_QUANTILES.map(|q| quantile_sorted(&sorted, q)),
            n_eff,
            r_hat: split_r_hat(draws),
        }
    }

    pub fn median(&self) -> f64 {
        self.quantiles[2]
    }
}

/// Autocovariance of a chain at `lag`, normalised by the chain length
fn autocovariance(chain: ArrayView1<'_, f64>, chain_mean: f64, lag: usize) -> f64 {
    let n = chain.len();
    (0..n - lag)
        .map(|i| (chain[i] - chain_mean) * (chain[i + lag] - chain_mean))
        .sum::<f64>()
        / n as f64
}

/// Effective sample size of draws laid out as (chains, draws per chain)
///
/// The autocorrelation sum is truncated with Geyer's initial monotone
/// sequence over the pooled within-chain autocovariances.
///
/// # Arguments
///
/// * `draws` - Draws of one parameter, one row per chain
///
/// # Returns
///
/// Estimated number of independent draws, or NaN when there are fewer than
/// four draws per chain.
pub fn effective_sample_size(draws: ArrayView2<'_, f64>) -> f64 {
    let (m, n) = draws.dim();
    if m == 0 || n < 4 {
        return f64::NAN;
    }
    let chains: Vec<ArrayView1<'_, f64>> = draws.axis_iter(Axis(0)).collect();
    let means: Vec<f64> = chains
        .iter()
        .map(|c| c.mean().unwrap_or(f64::NAN))
        .collect();
    let acov0: Vec<f64> = chains
        .iter()
        .zip(&means)
        .map(|(c, &mu)| autocovariance(*c, mu, 0))
        .collect();

    let nf = n as f64;
    let within = mean(&acov0) * nf / (nf - 1.0);
    let between = if m > 1 { variance(&means, 1) } else { 0.0 };
    let var_plus = within * (nf - 1.0) / nf + between;
    if !(var_plus > 0.0) {
        return f64::NAN;
    }

    let rho = |lag: usize| -> f64 {
        let acov: Vec<f64> = chains
            .iter()
            .zip(&means)
            .map(|(c, &mu)| autocovariance(*c, mu, lag))
            .collect();
        1.0 - (within - mean(&acov)) / var_plus
    };

    // Geyer: sum pairs rho(2k) + rho(2k+1) while positive, forced monotone
    let mut sum_pairs = 0.0;
    let mut previous = f64::INFINITY;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = (rho(lag) + rho(lag + 1)).min(previous);
        if pair <= 0.0 {
            break;
        }
        sum_pairs += pair;
        previous = pair;
        lag += 2;
    }

    let total = (m * n) as f64;
    // Capped at total * log10(total) for antithetic chains
    let tau = (-1.0 + 2.0 * sum_pairs).max(1.0 / total.log10());
    total / tau
}

/// Potential scale reduction factor with every chain split into two halves
///
/// NaN when a half chain has fewer than two draws.
pub fn split_r_hat(draws: ArrayView2<'_, f64>) -> f64 {
    let (m, n) = draws.dim();
    let half = n / 2;
    if m == 0 || half < 2 {
        return f64::NAN;
    }

    let mut means = Vec::with_capacity(2 * m);
    let mut variances = Vec::with_capacity(2 * m);
    for chain in draws.axis_iter(Axis(0)) {
        let values: Vec<f64> = chain.iter().copied().collect();
        // The middle draw of an odd-length chain is dropped
        for split in [&values[..half], &values[n - half..]] {
            means.push(mean(split));
            variances.push(variance(split, 1));
        }
    }

    let h = half as f64;
    let within = mean(&variances);
    let between = h * variance(&means, 1);
    if !(within > 0.0) {
        return f64::NAN;
    }
    let var_plus = (h - 1.0) / h * within + between / h;
    (var_plus / within).sqrt()
}

/// Summary of a whole sampling run
#[derive(Debug, Clone)]
pub struct FitSummary {
    pub model: String,
    pub chains: usize,
    pub iterations: usize,
    pub warmup: usize,
    pub thin: usize,
    pub draws_per_chain: usize,
    pub parameters: Vec<ParameterSummary>,
}

impl FitSummary {
    pub fn from_samples(model: &str, samples: &PosteriorSamples) -> Self {
        let parameters: Vec<ParameterSummary> = samples
            .names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                ParameterSummary::from_draws(name, samples.draws.index_axis(Axis(2), i))
            })
            .collect();

        for p in &parameters {
            if p.r_hat > RHAT_WARNING_THRESHOLD {
                warn!(
                    "{}: R-hat {:.3} exceeds {}, chains have not converged",
                    p.name, p.r_hat, RHAT_WARNING_THRESHOLD
                );
            }
        }

        Self {
            model: model.to_string(),
            chains: samples.num_chains(),
            iterations: samples.iterations,
            warmup: samples.warmup,
            thin: samples.thin,
            draws_per_chain: samples.draws_per_chain(),
            parameters,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSummary> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn total_draws(&self) -> usize {
        self.chains * self.draws_per_chain
    }
}

impl fmt::Display for FitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inference for model: {}.", self.model)?;
        writeln!(
            f,
            "{} chains, each with iter={}; warmup={}; thin={};",
            self.chains, self.iterations, self.warmup, self.thin
        )?;
        writeln!(
            f,
            "post-warmup draws per chain={}, total post-warmup draws={}.",
            self.draws_per_chain,
            self.total_draws()
        )?;
        writeln!(f)?;

        let width = self
            .parameters
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0)
            .max(4);
        write!(f, "{:width$} {:>8} {:>8} {:>8}", "", "mean", "se_mean", "sd")?;
        for label in QUANTILE_LABELS {
            write!(f, " {:>8}", label)?;
        }
        writeln!(f, " {:>8} {:>6}", "n_eff", "Rhat")?;

        for p in &self.parameters {
            write!(f, "{:width$} {:>8.2} {:>8.2} {:>8.2}", p.name, p.mean, p.se_mean, p.sd)?;
            for q in p.quantiles {
                write!(f, " {:>8.2}", q)?;
            }
            writeln!(f, " {:>8.0} {:>6.2}", p.n_eff, p.r_hat)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "For each parameter, n_eff is a crude measure of effective sample size,"
        )?;
        writeln!(
            f,
            "and Rhat is the potential scale reduction factor on split chains (at"
        )?;
        write!(f, "convergence, Rhat=1).")
    }
}
