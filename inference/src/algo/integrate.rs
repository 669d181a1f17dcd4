//! Numerical quadrature

/// Composite Simpson's rule for `f` over `[a, b]` with `intervals` subintervals
///
/// An odd interval count is rounded up to the next even number. Exact for
/// polynomials up to third degree.
///
/// # Arguments
///
/// * `f` - Integrand
/// * `a`, `b` - Integration bounds
/// * `intervals` - Number of subintervals, at least 2
///
/// # Returns
///
/// Approximation of the integral of `f` from `a` to `b`
pub fn simpson<F>(f: F, a: f64, b: f64, intervals: usize) -> f64
where
    F: Fn(f64) -> f64,
{
    let n = (intervals.max(2) + 1) & !1;
    let h = (b - a) / n as f64;

    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cubic_is_exact() {
        let integral = simpson(|x| x.powi(3) - 2.0 * x + 1.0, 0.0, 2.0, 2);
        assert_relative_eq!(integral, 4.0 - 4.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_intervals_rounded_up() {
        let integral = simpson(|x| x * x, 0.0, 3.0, 3);
        assert_relative_eq!(integral, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exponential_converges() {
        let integral = simpson(f64::exp, 0.0, 1.0, 64);
        assert_relative_eq!(integral, std::f64::consts::E - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_bounds_flip_sign() {
        let forward = simpson(|x| x.sin(), 0.0, 1.0, 32);
        let backward = simpson(|x| x.sin(), 1.0, 0.0, 32);
        assert_relative_eq!(forward, -backward, epsilon = 1e-12);
    }
}
