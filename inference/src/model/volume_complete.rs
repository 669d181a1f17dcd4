//! Model for a survey containing every star in the volume

use super::{initial_distance, initial_hyper_from_stars, Hyper, LuminosityModel, ModelState, Star};
use crate::data::LuminosityData;
use crate::error::Result;
use rand::Rng;

/// Luminosity model without survey selection
#[derive(Debug, Clone)]
pub struct VolumeCompleteModel {
    data: LuminosityData,
}

impl VolumeCompleteModel {
    pub fn new(data: LuminosityData) -> Result<Self> {
        data.validate()?;
        Ok(Self { data })
    }
}

impl LuminosityModel for VolumeCompleteModel {
    fn name(&self) -> &'static str {
        "luminosity inference, distance prior, volume complete"
    }

    fn data(&self) -> &LuminosityData {
        &self.data
    }

    fn ln_selection_probability(&self, _hyper: &Hyper) -> f64 {
        0.0
    }

    fn initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelState {
        let stars: Vec<Star> = (0..self.data.len())
            .map(|i| {
                let dist = initial_distance(&self.data, i, rng);
                let app_mag = self.data.obs_mag[i] + self.data.err_mag[i] * rng.gen_range(-1.0..1.0);
                Star::from_apparent(dist, app_mag)
            })
            .collect();
        let hyper = initial_hyper_from_stars(&stars, rng);
        ModelState { hyper, stars }
    }
}
