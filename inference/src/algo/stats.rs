//! Statistical functions for the models and posterior summaries

use scilib::math::basic::erf;
use std::f64::consts::{PI, SQRT_2};

/// ln(sqrt(2 pi))
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Cumulative distribution function for standard normal distribution
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Log density of N(mu, sigma) at x
pub fn normal_ln_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LN_SQRT_2PI
}

/// Log density of the half-Cauchy(0, scale) distribution at x >= 0
pub fn half_cauchy_ln_pdf(x: f64, scale: f64) -> f64 {
    let z = x / scale;
    (2.0 / (PI * scale)).ln() - (1.0 + z * z).ln()
}

/// Arithmetic mean, NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n), NaN for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values, 0).sqrt()
}

/// Variance with `ddof` delta degrees of freedom
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

/// Quantile of already sorted data with linear interpolation between order statistics
///
/// Position `(n - 1) * q` is interpolated, the convention of numpy's default
/// percentile. Returns NaN for empty input.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Quantile of unsorted data, NaN values are ignored
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_erf_basic_values() {
        assert!((erf(0.0) - 0.0).abs() < 1e-6);
        assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
        assert!((erf(-1.0) - (-0.8427007929)).abs() < 1e-6);
        assert!(erf(5.0) > 0.9999);
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((normal_cdf(1.0) - 0.8413447461).abs() < 1e-6);
        assert!((normal_cdf(-1.0) - 0.1586552539).abs() < 1e-6);
        assert!((normal_cdf(1.96) - 0.975).abs() < 0.001);
    }

    #[test]
    fn test_normal_ln_pdf() {
        assert_relative_eq!(normal_ln_pdf(0.0, 0.0, 1.0), -LN_SQRT_2PI, epsilon = 1e-12);
        assert_relative_eq!(LN_SQRT_2PI, (2.0 * PI).sqrt().ln(), epsilon = 1e-15);
        // Shifting and scaling: N(x | mu, s) = N((x - mu) / s | 0, 1) / s
        assert_relative_eq!(
            normal_ln_pdf(7.0, 5.0, 2.0),
            normal_ln_pdf(1.0, 0.0, 1.0) - 2f64.ln(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_half_cauchy_normalised_at_zero() {
        assert_relative_eq!(
            half_cauchy_ln_pdf(0.0, 1.0).exp(),
            2.0 / PI,
            epsilon = 1e-12
        );
        assert!(half_cauchy_ln_pdf(3.0, 1.0) < half_cauchy_ln_pdf(1.0, 1.0));
    }

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(std_dev(&values), 2.0);
        assert_relative_eq!(variance(&values, 1), 32.0 / 7.0);
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(quantile(&values, 0.5), 3.0);
        assert_relative_eq!(quantile(&values, 0.0), 1.0);
        assert_relative_eq!(quantile(&values, 1.0), 5.0);
        assert_relative_eq!(quantile(&values, 0.25), 2.0);
        assert_relative_eq!(quantile(&values, 0.1), 1.4);
    }

    #[test]
    fn test_quantile_ignores_nan_and_handles_empty() {
        assert_relative_eq!(quantile(&[1.0, f64::NAN, 3.0], 0.5), 2.0);
        assert!(quantile(&[], 0.5).is_nan());
        assert!(quantile(&[f64::NAN], 0.5).is_nan());
    }
}
