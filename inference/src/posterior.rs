//! Posterior draws returned by the sampler

use crate::error::{InferenceError, Result};
use log::info;
use ndarray::{s, Array2, Array3, ArrayView2, Axis};
use std::path::Path;

/// Acceptance rates of one chain, measured after warmup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainAcceptance {
    /// Mean acceptance rate of the hyper parameter updates
    pub hyper: f64,
    /// Mean acceptance rate of the per-star updates
    pub stars: f64,
}

/// Thinned post-warmup draws of the retained parameters
#[derive(Debug, Clone)]
pub struct PosteriorSamples {
    /// Parameter names, matching the last axis of `draws`
    pub names: Vec<String>,
    /// Draws with shape (chains, draws per chain, parameters)
    pub draws: Array3<f64>,
    pub iterations: usize,
    pub warmup: usize,
    pub thin: usize,
    /// Base seed of the chains
    pub seed: u64,
    pub acceptance: Vec<ChainAcceptance>,
}

impl PosteriorSamples {
    pub fn num_chains(&self) -> usize {
        self.draws.len_of(Axis(0))
    }

    pub fn draws_per_chain(&self) -> usize {
        self.draws.len_of(Axis(1))
    }

    /// Total number of retained draws over all chains
    pub fn total_draws(&self) -> usize {
        self.num_chains() * self.draws_per_chain()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| InferenceError::UnknownParameter(name.to_string()))
    }

    /// Draws of one parameter with shape (chains, draws per chain)
    pub fn parameter(&self, name: &str) -> Result<ArrayView2<'_, f64>> {
        let idx = self.index_of(name)?;
        Ok(self.draws.slice(s![.., .., idx]))
    }

    /// Draws of one parameter with all chains concatenated
    pub fn pooled(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.parameter(name)?.iter().copied().collect())
    }

    /// All draws as a (total draws, parameters) matrix, chains stacked in order
    pub fn to_matrix(&self) -> Array2<f64> {
        let (chains, draws, params) = self.draws.dim();
        let mut matrix = Array2::zeros((chains * draws, params));
        for c in 0..chains {
            matrix
                .slice_mut(s![c * draws..(c + 1) * draws, ..])
                .assign(&self.draws.index_axis(Axis(0), c));
        }
        matrix
    }

    /// Write the draws as CSV with columns `chain,draw,<parameter names>`
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut wtr = csv::Writer::from_path(path)?;

        let mut header = vec!["chain".to_string(), "draw".to_string()];
        header.extend(self.names.iter().cloned());
        wtr.write_record(&header)?;

        let (chains, draws, params) = self.draws.dim();
        for c in 0..chains {
            for d in 0..draws {
                let mut record = vec![c.to_string(), d.to_string()];
                record.extend((0..params).map(|p| format!("{:.6}", self.draws[[c, d, p]])));
                wtr.write_record(&record)?;
            }
        }

        wtr.flush()?;
        info!("Wrote {} posterior draws to {}", chains * draws, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn samples() -> PosteriorSamples {
        // chain c, draw d: meanAbsMag = 9 + c + d / 10, sigmaAbsMag = 0.5 + d / 100
        let draws = Array3::from_shape_fn((2, 3, 2), |(c, d, p)| match p {
            0 => 9.0 + c as f64 + d as f64 / 10.0,
            _ => 0.5 + d as f64 / 100.0,
        });
        PosteriorSamples {
            names: vec!["meanAbsMag".to_string(), "sigmaAbsMag".to_string()],
            draws,
            iterations: 10,
            warmup: 4,
            thin: 2,
            seed: 1,
            acceptance: vec![
                ChainAcceptance {
                    hyper: 0.4,
                    stars: 0.45
                };
                2
            ],
        }
    }

    #[test]
    fn test_shapes() {
        let s = samples();
        assert_eq!(s.num_chains(), 2);
        assert_eq!(s.draws_per_chain(), 3);
        assert_eq!(s.total_draws(), 6);
    }

    #[test]
    fn test_parameter_lookup() {
        let s = samples();
        let mu = s.parameter("meanAbsMag").unwrap();
        assert_eq!(mu.dim(), (2, 3));
        assert_relative_eq!(mu[[1, 2]], 10.2, epsilon = 1e-12);
        let sigma = s.pooled("sigmaAbsMag").unwrap();
        assert_eq!(sigma.len(), 6);
        for (got, want) in sigma.iter().zip([0.5, 0.51, 0.52, 0.5, 0.51, 0.52]) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
        assert!(matches!(
            s.parameter("absMag"),
            Err(InferenceError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_matrix_stacks_chains() {
        let m = samples().to_matrix();
        assert_eq!(m.dim(), (6, 2));
        assert_eq!(m[[0, 0]], 9.0);
        assert_eq!(m[[3, 0]], 10.0);
        assert_relative_eq!(m[[5, 1]], 0.52, epsilon = 1e-12);
    }

    #[test]
    fn test_write_csv() {
        let path = test_helpers::output_path("posterior_samples_test.csv");
        samples().write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("chain,draw,meanAbsMag,sigmaAbsMag"));
        assert_eq!(lines.next(), Some("0,0,9.000000,0.500000"));
        assert_eq!(text.lines().count(), 7);
    }
}
