//! Corner plot of posterior samples
//!
//! Marginal histograms sit on the diagonal with dashed lines at the 16, 50
//! and 84 % quantiles; the panels below the diagonal show the joint draws of
//! each pair of parameters. True values, when known, are overlaid in red.

use crate::algo::stats::quantile;
use crate::error::{InferenceError, Result};
use crate::posterior::PosteriorSamples;
use log::info;
use parallax_surveys::plot::{finite_range, histogram_bins};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const PANEL_SIZE: u32 = 500;
const HISTOGRAM_BINS: usize = 30;
const TITLE_QUANTILES: [f64; 3] = [0.16, 0.5, 0.84];

fn plot_err<E: std::fmt::Display>(e: E) -> InferenceError {
    InferenceError::Plot(e.to_string())
}

/// `label = median +upper -lower` from the 16, 50 and 84 % quantiles
pub fn quantile_title(label: &str, values: &[f64]) -> String {
    let [lo, mid, hi] = TITLE_QUANTILES.map(|q| quantile(values, q));
    format!("{label} = {mid:.2} +{:.2} -{:.2}", hi - mid, mid - lo)
}

/// Dashed vertical segment from `y0` to `y1`
fn dashed_vertical(x: f64, y0: f64, y1: f64, style: ShapeStyle) -> Vec<PathElement<(f64, f64)>> {
    const DASHES: usize = 12;
    let step = (y1 - y0) / (2 * DASHES) as f64;
    (0..DASHES)
        .map(|i| {
            let a = y0 + 2.0 * i as f64 * step;
            PathElement::new(vec![(x, a), (x, a + step)], style)
        })
        .collect()
}

/// Builder for a corner plot figure
#[derive(Debug, Clone)]
pub struct CornerPlot {
    labels: Vec<String>,
    truths: Option<Vec<f64>>,
}

impl CornerPlot {
    /// Axis labels, one per parameter in sample order
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            truths: None,
        }
    }

    /// Mark the values the samples should recover
    pub fn with_truths(mut self, truths: Vec<f64>) -> Self {
        self.truths = Some(truths);
        self
    }

    fn truth(&self, index: usize) -> Option<f64> {
        self.truths
            .as_ref()
            .and_then(|t| t.get(index).copied())
            .filter(|v| v.is_finite())
    }

    /// Render to a PNG file
    pub fn render<P: AsRef<Path>>(&self, samples: &PosteriorSamples, path: P) -> Result<()> {
        let path = path.as_ref();
        let n = samples.names.len();
        if self.labels.len() != n {
            return Err(InferenceError::LengthMismatch {
                column: "labels",
                expected: n,
                actual: self.labels.len(),
            });
        }
        if samples.total_draws() == 0 {
            return Err(InferenceError::Plot("no posterior draws to plot".to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let matrix = samples.to_matrix();
        let columns: Vec<Vec<f64>> = matrix.columns().into_iter().map(|c| c.to_vec()).collect();

        let side = PANEL_SIZE * n as u32;
        let root = BitMapBackend::new(path, (side, side)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let panels = root.split_evenly((n, n));

        for row in 0..n {
            for col in 0..=row {
                let area = &panels[row * n + col];
                if row == col {
                    self.draw_marginal(area, &columns[row], row)?;
                } else {
                    self.draw_joint(area, &columns[col], &columns[row], col, row)?;
                }
            }
        }

        root.present().map_err(plot_err)?;
        info!("Corner plot saved to {}", path.display());
        Ok(())
    }

    fn draw_marginal<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        values: &[f64],
        index: usize,
    ) -> Result<()> {
        let label = &self.labels[index];
        let mut range = finite_range(values)
            .ok_or_else(|| InferenceError::Plot(format!("no finite draws of {label}")))?;
        if let Some(t) = self.truth(index) {
            range = (range.0.min(t), range.1.max(t));
        }
        let bins = histogram_bins(values, range, HISTOGRAM_BINS);
        let top = bins.iter().map(|b| b.2).max().unwrap_or(1).max(1) as f64 * 1.1;

        let mut chart = ChartBuilder::on(area)
            .caption(quantile_title(label, values), ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d(range.0..range.1, 0.0..top)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc(label.as_str())
            .disable_y_mesh()
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(bins.iter().map(|&(lo, hi, count)| {
                Rectangle::new([(lo, 0.0), (hi, count as f64)], BLACK.mix(0.25).filled())
            }))
            .map_err(plot_err)?;

        let dash = BLACK.stroke_width(2);
        for q in TITLE_QUANTILES {
            let x = quantile(values, q);
            chart
                .draw_series(dashed_vertical(x, 0.0, top, dash))
                .map_err(plot_err)?;
        }

        if let Some(t) = self.truth(index) {
            chart
                .draw_series(LineSeries::new(vec![(t, 0.0), (t, top)], RED.stroke_width(2)))
                .map_err(plot_err)?;
        }
        Ok(())
    }

    fn draw_joint<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        xs: &[f64],
        ys: &[f64],
        x_index: usize,
        y_index: usize,
    ) -> Result<()> {
        let mut x_range = finite_range(xs).unwrap_or((0.0, 1.0));
        let mut y_range = finite_range(ys).unwrap_or((0.0, 1.0));
        let (x_truth, y_truth) = (self.truth(x_index), self.truth(y_index));
        if let Some(t) = x_truth {
            x_range = (x_range.0.min(t), x_range.1.max(t));
        }
        if let Some(t) = y_truth {
            y_range = (y_range.0.min(t), y_range.1.max(t));
        }

        let mut chart = ChartBuilder::on(area)
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(55)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc(self.labels[x_index].as_str())
            .y_desc(self.labels[y_index].as_str())
            .draw()
            .map_err(plot_err)?;

        chart
            .draw_series(
                xs.iter()
                    .zip(ys)
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .map(|(&x, &y)| Circle::new((x, y), 1, BLACK.mix(0.3).filled())),
            )
            .map_err(plot_err)?;

        let truth_style = RED.stroke_width(2);
        if let Some(t) = x_truth {
            chart
                .draw_series(LineSeries::new(vec![(t, y_range.0), (t, y_range.1)], truth_style))
                .map_err(plot_err)?;
        }
        if let Some(t) = y_truth {
            chart
                .draw_series(LineSeries::new(vec![(x_range.0, t), (x_range.1, t)], truth_style))
                .map_err(plot_err)?;
        }
        if let (Some(x), Some(y)) = (x_truth, y_truth) {
            chart
                .draw_series(std::iter::once(Circle::new((x, y), 5, RED.filled())))
                .map_err(plot_err)?;
        }
        Ok(())
    }
}
