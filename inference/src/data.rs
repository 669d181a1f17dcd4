//! Model input assembled from a parallax survey

use crate::error::{InferenceError, Result};
use ndarray::Array1;
use parallax_surveys::ParallaxSurvey;

/// Observations and survey geometry handed to a luminosity model
#[derive(Debug, Clone)]
pub struct LuminosityData {
    /// Inner edge of the distance prior (pc)
    pub min_dist: f64,
    /// Outer edge of the distance prior (pc)
    pub max_dist: f64,
    /// Apparent magnitude limit, only set for magnitude limited surveys
    pub survey_limit: Option<f64>,
    /// Observed parallaxes (mas)
    pub obs_plx: Array1<f64>,
    /// Parallax standard errors (mas)
    pub err_plx: Array1<f64>,
    /// Observed apparent magnitudes
    pub obs_mag: Array1<f64>,
    /// Apparent magnitude standard errors
    pub err_mag: Array1<f64>,
}

impl LuminosityData {
    /// Copy the observed columns of a survey
    ///
    /// The survey's apparent magnitude limit is only carried over when the
    /// survey is not treated as volume complete.
    pub fn from_survey(survey: &ParallaxSurvey, volume_complete: bool) -> Result<Self> {
        let data = Self {
            min_dist: survey.config.min_distance,
            max_dist: survey.config.max_distance,
            survey_limit: (!volume_complete).then_some(survey.apparent_magnitude_limit),
            obs_plx: survey.observed_parallaxes.clone(),
            err_plx: survey.parallax_errors.clone(),
            obs_mag: survey.observed_magnitudes.clone(),
            err_mag: survey.magnitude_errors.clone(),
        };
        data.validate()?;
        Ok(data)
    }

    /// Number of stars
    pub fn len(&self) -> usize {
        self.obs_plx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs_plx.is_empty()
    }

    /// Check columns line up and every value is usable
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        if n == 0 {
            return Err(InferenceError::EmptyData);
        }
        if !(self.min_dist.is_finite() && self.max_dist.is_finite())
            || self.min_dist <= 0.0
            || self.min_dist >= self.max_dist
        {
            return Err(parallax_surveys::SurveyError::InvalidDistanceRange {
                min: self.min_dist,
                max: self.max_dist,
            }
            .into());
        }

        for (column, values) in [
            ("err_plx", &self.err_plx),
            ("obs_mag", &self.obs_mag),
            ("err_mag", &self.err_mag),
        ] {
            if values.len() != n {
                return Err(InferenceError::LengthMismatch {
                    column,
                    expected: n,
                    actual: values.len(),
                });
            }
        }

        for (column, values) in [("parallax", &self.obs_plx), ("magnitude", &self.obs_mag)] {
            if let Some(index) = values.iter().position(|v| !v.is_finite()) {
                return Err(InferenceError::NonFiniteObservation { column, index });
            }
        }

        for (column, values) in [("parallax", &self.err_plx), ("magnitude", &self.err_mag)] {
            if let Some((index, &value)) = values
                .iter()
                .enumerate()
                .find(|(_, e)| !(e.is_finite() && **e > 0.0))
            {
                return Err(InferenceError::InvalidUncertainty {
                    column,
                    index,
                    value,
                });
            }
        }

        if self.survey_limit.is_some_and(|m| !m.is_finite()) {
            return Err(InferenceError::MissingSurveyLimit);
        }
        Ok(())
    }
}
