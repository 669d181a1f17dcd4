//! Survey statistics figure
//!
//! Renders a 2x2 panel overview of a simulated survey: the true distance
//! distribution, observed against true parallaxes, the observed magnitude
//! distribution with the survey limit, and relative parallax errors as a
//! function of apparent magnitude.

use crate::error::SurveyError;
use crate::statistics::GOOD_RELATIVE_PARALLAX_ERROR;
use crate::survey::ParallaxSurvey;
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Figure size in pixels
const FIGURE_SIZE: (u32, u32) = (1600, 1200);

pub(crate) fn plot_err<E: std::fmt::Display>(e: E) -> SurveyError {
    SurveyError::Plot(e.to_string())
}

/// One histogram bin: lower edge, upper edge and count
pub type HistogramBin = (f64, f64, usize);

/// Count `values` into `n_bins` equal bins spanning `range`
///
/// Values outside the range and NaNs are ignored. The upper edge is inclusive
/// so the maximum of a data set lands in the last bin.
pub fn histogram_bins(values: &[f64], range: (f64, f64), n_bins: usize) -> Vec<HistogramBin> {
    let (lo, hi) = range;
    if n_bins == 0 || !(hi > lo) {
        return Vec::new();
    }
    let width = (hi - lo) / n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    for &v in values {
        if v.is_nan() || v < lo || v > hi {
            continue;
        }
        let idx = (((v - lo) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + i as f64 * width, lo + (i + 1) as f64 * width, c))
        .collect()
}

/// Min and max of the finite values, padded when the data has no spread
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return None;
    }
    if max - min < 1e-12 {
        return Some((min - 0.5, max + 0.5));
    }
    Some((min, max))
}

fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    values: &[f64],
    caption: &str,
    x_desc: &str,
    marker: Option<f64>,
) -> Result<(), SurveyError> {
    let range = finite_range(values)
        .ok_or_else(|| SurveyError::Plot(format!("no data for {caption}")))?;
    let bins = histogram_bins(values, range, 20);
    let max_count = bins.iter().map(|b| b.2).max().unwrap_or(1).max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(range.0..range.1, 0.0..(max_count as f64 * 1.1))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc("Number of stars")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(bins.iter().map(|&(lo, hi, count)| {
            Rectangle::new([(lo, 0.0), (hi, count as f64)], BLUE.mix(0.5).filled())
        }))
        .map_err(plot_err)?;

    if let Some(x) = marker.filter(|x| x.is_finite() && *x >= range.0 && *x <= range.1) {
        chart
            .draw_series(LineSeries::new(
                vec![(x, 0.0), (x, max_count as f64 * 1.1)],
                RED.stroke_width(2),
            ))
            .map_err(plot_err)?;
    }
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    points: &[(f64, f64)],
    caption: &str,
    labels: (&str, &str),
    reference: Reference,
) -> Result<(), SurveyError> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    // An empty panel still gets axes
    let x_range = finite_range(&xs).unwrap_or((0.0, 1.0));
    let y_range = finite_range(&ys).unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(labels.0)
        .y_desc(labels.1)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| Circle::new((x, y), 3, BLACK.mix(0.6).filled())),
        )
        .map_err(plot_err)?;

    let line = match reference {
        Reference::Diagonal => {
            let lo = x_range.0.max(y_range.0);
            let hi = x_range.1.min(y_range.1);
            (lo < hi).then(|| vec![(lo, lo), (hi, hi)])
        }
        Reference::Horizontal(y) => {
            (y >= y_range.0 && y <= y_range.1).then(|| vec![(x_range.0, y), (x_range.1, y)])
        }
    };
    if let Some(line) = line {
        chart
            .draw_series(LineSeries::new(line, RED.stroke_width(2)))
            .map_err(plot_err)?;
    }
    Ok(())
}

/// Reference line drawn over a scatter panel
enum Reference {
    /// y = x
    Diagonal,
    /// y = constant
    Horizontal(f64),
}

/// Render the survey statistics figure to a PNG file
pub fn plot_survey_statistics<P: AsRef<Path>>(
    survey: &ParallaxSurvey,
    path: P,
) -> Result<(), SurveyError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let panels = root.split_evenly((2, 2));

    draw_histogram(
        &panels[0],
        &survey.true_distances.to_vec(),
        "True distances",
        "Distance (pc)",
        None,
    )?;

    let parallaxes: Vec<(f64, f64)> = survey
        .true_parallaxes
        .iter()
        .zip(survey.observed_parallaxes.iter())
        .map(|(&t, &o)| (t, o))
        .collect();
    draw_scatter(
        &panels[1],
        &parallaxes,
        "Observed vs true parallax",
        ("True parallax (mas)", "Observed parallax (mas)"),
        Reference::Diagonal,
    )?;

    draw_histogram(
        &panels[2],
        &survey.observed_magnitudes.to_vec(),
        "Observed apparent magnitudes",
        "Apparent magnitude",
        Some(survey.apparent_magnitude_limit),
    )?;

    let relative: Vec<(f64, f64)> = survey
        .observed_magnitudes
        .iter()
        .zip(survey.relative_parallax_errors().iter())
        .map(|(&m, &r)| (m, r))
        .filter(|&(_, r)| r > 0.0 && r <= 1.0)
        .collect();
    draw_scatter(
        &panels[3],
        &relative,
        "Relative parallax errors",
        ("Apparent magnitude", "Parallax error / parallax"),
        Reference::Horizontal(GOOD_RELATIVE_PARALLAX_ERROR),
    )?;

    root.present().map_err(plot_err)?;
    info!("Survey statistics plot saved to {}", path.display());
    Ok(())
}
