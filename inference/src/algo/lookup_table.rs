//! Tabulated function on a regular grid with quadratic interpolation.
//!
//! Small empirical correction tables (the Lutz-Kelker table among them) are
//! published as values at evenly spaced abscissae. `LookupTable` stores such
//! a table and evaluates it between grid points with a second-order Lagrange
//! polynomial through the three nearest nodes.
//!
//! # Example
//!
//! ```
//! use luminosity_inference::algo::lookup_table::LookupTable;
//!
//! let squares = LookupTable::from_values(0.0, 4.0, vec![0.0, 1.0, 4.0, 9.0, 16.0]).unwrap();
//! assert!((squares.eval(2.5).unwrap() - 6.25).abs() < 1e-12);
//! ```

use crate::error::{InferenceError, Result};

/// A regular-grid table with quadratic interpolation.
#[derive(Debug, Clone)]
pub struct LookupTable {
    /// Domain bounds (min, max)
    domain: (f64, f64),
    /// Step size between grid points
    dx: f64,
    /// Tabulated function values
    values: Vec<f64>,
}

impl LookupTable {
    /// Create a table from values tabulated at `n` evenly spaced points
    /// between `x_min` and `x_max` inclusive.
    ///
    /// # Arguments
    ///
    /// * `x_min` - Abscissa of the first value
    /// * `x_max` - Abscissa of the last value
    /// * `values` - Tabulated values, at least 3
    ///
    /// # Returns
    ///
    /// The table, or `InferenceError::InvalidTable` for fewer than 3 values
    /// or an empty domain.
    pub fn from_values(x_min: f64, x_max: f64, values: Vec<f64>) -> Result<Self> {
        if values.len() < 3 {
            return Err(InferenceError::InvalidTable(format!(
                "need at least 3 values for quadratic interpolation, got {}",
                values.len()
            )));
        }
        if !(x_min < x_max) {
            return Err(InferenceError::InvalidTable(format!(
                "x_min {x_min} must be less than x_max {x_max}"
            )));
        }
        let dx = (x_max - x_min) / (values.len() - 1) as f64;
        Ok(Self {
            domain: (x_min, x_max),
            dx,
            values,
        })
    }

    /// Evaluate the table at `x` using quadratic interpolation.
    ///
    /// Returns `InferenceError::OutOfBounds` outside the tabulated domain.
    pub fn eval(&self, x: f64) -> Result<f64> {
        if !self.contains(x) {
            return Err(InferenceError::OutOfBounds {
                value: x,
                min: self.domain.0,
                max: self.domain.1,
            });
        }
        let n_points = self.values.len();
        let t = (x - self.domain.0) / self.dx;
        let i = t.floor() as isize;

        // Stencil of three nodes, shifted inwards at the upper end
        let i = if i < 0 {
            0
        } else if i >= (n_points - 2) as isize {
            n_points - 3
        } else {
            i as usize
        };

        let x0 = self.domain.0 + i as f64 * self.dx;
        let x1 = x0 + self.dx;
        let x2 = x1 + self.dx;

        let y0 = self.values[i];
        let y1 = self.values[i + 1];
        let y2 = self.values[i + 2];

        let l0 = ((x - x1) * (x - x2)) / ((x0 - x1) * (x0 - x2));
        let l1 = ((x - x0) * (x - x2)) / ((x1 - x0) * (x1 - x2));
        let l2 = ((x - x0) * (x - x1)) / ((x2 - x0) * (x2 - x1));

        Ok(y0 * l0 + y1 * l1 + y2 * l2)
    }

    /// Evaluate after clamping `x` into the domain
    pub fn eval_clamped(&self, x: f64) -> f64 {
        let x = x.clamp(self.domain.0, self.domain.1);
        // Clamped values are always inside the domain
        self.eval(x).unwrap_or(f64::NAN)
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Check if a value is within the table's domain.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.domain.0 && x <= self.domain.1
    }
}
