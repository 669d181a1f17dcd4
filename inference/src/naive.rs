//! Naive luminosity estimate from inverted parallaxes
//!
//! Stars with relative parallax errors below [`LK_RELATIVE_ERROR_LIMIT`] get
//! an absolute magnitude from the observed parallax, `M = m + 5 log10(plx) - 10`
//! with `plx` in mas. The same estimate is also reported with the
//! Lutz-Kelker bias correction added per star.

use crate::algo::lookup_table::LookupTable;
use crate::algo::stats::{mean, std_dev};
use crate::error::{InferenceError, Result};
use log::debug;
use ndarray::ArrayView1;
use std::fmt;

/// Largest relative parallax error the Lutz-Kelker table covers
pub const LK_RELATIVE_ERROR_LIMIT: f64 = 0.175;

/// Lutz-Kelker corrections at `0, 0.025, ..., 0.175` relative parallax error
pub const LK_CORRECTIONS: [f64; 8] = [0.0, -0.01, -0.02, -0.06, -0.11, -0.18, -0.28, -0.43];

/// Fewest good parallaxes the estimate is made from
pub const MIN_GOOD_PARALLAXES: usize = 3;

/// Lutz-Kelker correction as a function of relative parallax error
pub fn lutz_kelker_table() -> Result<LookupTable> {
    LookupTable::from_values(0.0, LK_RELATIVE_ERROR_LIMIT, LK_CORRECTIONS.to_vec())
}

/// Mean and spread of the absolute magnitudes from good parallaxes
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveEstimate {
    /// Stars used
    pub good: usize,
    /// Stars in the survey
    pub total: usize,
    pub mean: f64,
    pub sigma: f64,
    /// Mean after the Lutz-Kelker correction
    pub corrected_mean: f64,
    /// Spread after the Lutz-Kelker correction
    pub corrected_sigma: f64,
}

/// Estimate the mean absolute magnitude and its spread from the stars with
/// `obs_plx / err_plx >= 1 / 0.175`
///
/// # Arguments
///
/// * `obs_plx` - Observed parallaxes (mas)
/// * `err_plx` - Parallax standard errors (mas)
/// * `obs_mag` - Observed apparent magnitudes
///
/// # Returns
///
/// The plain and Lutz-Kelker corrected estimates, or
/// `InferenceError::TooFewGoodParallaxes` when fewer than
/// [`MIN_GOOD_PARALLAXES`] stars qualify.
pub fn naive_luminosity_estimate(
    obs_plx: ArrayView1<'_, f64>,
    err_plx: ArrayView1<'_, f64>,
    obs_mag: ArrayView1<'_, f64>,
) -> Result<NaiveEstimate> {
    let total = obs_plx.len();
    for (column, len) in [("err_plx", err_plx.len()), ("obs_mag", obs_mag.len())] {
        if len != total {
            return Err(InferenceError::LengthMismatch {
                column,
                expected: total,
                actual: len,
            });
        }
    }

    let table = lutz_kelker_table()?;
    let min_snr = 1.0 / LK_RELATIVE_ERROR_LIMIT;

    let (raw, corrected): (Vec<f64>, Vec<f64>) = obs_plx
        .iter()
        .zip(err_plx.iter())
        .zip(obs_mag.iter())
        .filter(|((plx, err), _)| **plx / **err >= min_snr)
        .map(|((plx, err), mag)| {
            let abs_mag = mag + 5.0 * plx.log10() - 10.0;
            (abs_mag, abs_mag + table.eval_clamped(err / plx))
        })
        .unzip();

    let good = raw.len();
    debug!("Naive estimate from {good}/{total} good parallaxes");
    if good < MIN_GOOD_PARALLAXES {
        return Err(InferenceError::TooFewGoodParallaxes {
            good,
            required: MIN_GOOD_PARALLAXES,
        });
    }

    Ok(NaiveEstimate {
        good,
        total,
        mean: mean(&raw),
        sigma: std_dev(&raw),
        corrected_mean: mean(&corrected),
        corrected_sigma: std_dev(&corrected),
    })
}

impl fmt::Display for NaiveEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Number of 'good' parallaxes used {}/{}",
            self.good, self.total
        )?;
        writeln!(f, "### Naive estimate ###")?;
        writeln!(f, "Mean and sigma: {:.2}, {:.2}", self.mean, self.sigma)?;
        writeln!(f, "### Naive estimate after LK correction ###")?;
        write!(
            f,
            "Mean and sigma: {:.2}, {:.2}",
            self.corrected_mean, self.corrected_sigma
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_table_matches_tabulated_values() {
        let table = lutz_kelker_table().unwrap();
        for (i, expected) in LK_CORRECTIONS.iter().enumerate() {
            let x = i as f64 * LK_RELATIVE_ERROR_LIMIT / 7.0;
            assert_relative_eq!(table.eval_clamped(x), *expected, epsilon = 1e-12);
        }
        // Corrections get more negative with larger errors
        assert!(table.eval_clamped(0.16) < table.eval_clamped(0.1));
    }

    #[test]
    fn test_precise_parallaxes_give_exact_magnitudes() {
        // plx = 100 mas (10 pc), so M = m
        let plx = array![100.0, 100.0, 100.0, 50.0];
        let err = array![0.01, 0.01, 0.01, 0.01];
        let mag = array![9.0, 10.0, 11.0, 10.0 + 5.0 * 2f64.log10()];
        let est = naive_luminosity_estimate(plx.view(), err.view(), mag.view()).unwrap();

        assert_eq!(est.good, 4);
        assert_eq!(est.total, 4);
        assert_relative_eq!(est.mean, 10.0, epsilon = 1e-9);
        assert_relative_eq!(est.sigma, 0.5f64.sqrt(), epsilon = 1e-9);
        // Relative errors of 1e-4 to 2e-4 barely move the estimate
        assert_relative_eq!(est.corrected_mean, est.mean, epsilon = 1e-3);
    }

    #[test]
    fn test_poor_parallaxes_are_dropped() {
        let plx = array![100.0, 100.0, 100.0, 5.0, -2.0];
        let err = array![1.0, 1.0, 1.0, 1.0, 1.0];
        let mag = array![9.0, 9.0, 9.0, 20.0, 20.0];
        let est = naive_luminosity_estimate(plx.view(), err.view(), mag.view()).unwrap();
        assert_eq!(est.good, 3);
        assert_eq!(est.total, 5);
        assert_relative_eq!(est.mean, 9.0, epsilon = 1e-12);
        assert_relative_eq!(est.sigma, 0.0, epsilon = 1e-12);
        // 1 % relative error lies in the first table interval
        assert!(est.corrected_mean < est.mean && est.corrected_mean > est.mean - 0.01);
    }

    #[test]
    fn test_large_relative_error_gets_large_correction() {
        // 17 % relative error, between the last two table nodes
        let plx = array![100.0, 100.0, 100.0];
        let err = array![17.0, 17.0, 17.0];
        let mag = array![10.0, 10.0, 10.0];
        let est = naive_luminosity_estimate(plx.view(), err.view(), mag.view()).unwrap();
        let correction = est.corrected_mean - est.mean;
        assert!(correction < -0.28 && correction > -0.43, "{correction}");
    }

    #[test]
    fn test_too_few_good_parallaxes() {
        let plx = array![100.0, 100.0, 1.0];
        let err = array![1.0, 1.0, 1.0];
        let mag = array![9.0, 9.0, 9.0];
        assert!(matches!(
            naive_luminosity_estimate(plx.view(), err.view(), mag.view()),
            Err(InferenceError::TooFewGoodParallaxes {
                good: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let plx = array![100.0, 100.0, 100.0];
        let err = array![1.0, 1.0];
        let mag = array![9.0, 9.0, 9.0];
        assert!(matches!(
            naive_luminosity_estimate(plx.view(), err.view(), mag.view()),
            Err(InferenceError::LengthMismatch {
                column: "err_plx",
                ..
            })
        ));
    }

    #[test]
    fn test_display_lines() {
        let est = NaiveEstimate {
            good: 40,
            total: 50,
            mean: 9.012,
            sigma: 0.704,
            corrected_mean: 8.996,
            corrected_sigma: 0.711,
        };
        let text = est.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Number of 'good' parallaxes used 40/50",
                "### Naive estimate ###",
                "Mean and sigma: 9.01, 0.70",
                "### Naive estimate after LK correction ###",
                "Mean and sigma: 9.00, 0.71",
            ]
        );
    }
}
