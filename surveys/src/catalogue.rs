//! Astrometric catalogue error models
//!
//! Each simulated catalogue assigns parallax and photometric errors as a
//! function of apparent magnitude. Errors are flat for bright stars and grow
//! by a factor 10^0.2 per magnitude fainter than the catalogue's knee, which
//! mimics photon-noise limited astrometry.

use clap::ValueEnum;

/// Simulated astrometric catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Catalogue {
    /// Hipparcos-like astrometry
    #[value(name = "hip")]
    Hipparcos,
    /// Tycho-Gaia Astrometric Solution-like astrometry
    #[value(name = "tgas")]
    Tgas,
}

impl std::fmt::Display for Catalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Catalogue::Hipparcos => write!(f, "hip"),
            Catalogue::Tgas => write!(f, "tgas"),
        }
    }
}

/// Error model parameters for one catalogue
struct ErrorModel {
    /// Parallax error floor in mas
    parallax_floor: f64,
    /// Magnitude error floor in mag
    magnitude_floor: f64,
    /// Apparent magnitude where errors start growing
    knee: f64,
    /// Faintest apparent magnitude in the catalogue
    faint_limit: f64,
}

const HIPPARCOS: ErrorModel = ErrorModel {
    parallax_floor: 0.7,
    magnitude_floor: 0.003,
    knee: 8.0,
    faint_limit: 12.4,
};

const TGAS: ErrorModel = ErrorModel {
    parallax_floor: 0.3,
    magnitude_floor: 0.001,
    knee: 11.0,
    faint_limit: 13.0,
};

impl ErrorModel {
    fn growth(&self, apparent_mag: f64) -> f64 {
        10f64.powf(0.2 * (apparent_mag - self.knee)).max(1.0)
    }
}

impl Catalogue {
    fn model(&self) -> &'static ErrorModel {
        match self {
            Catalogue::Hipparcos => &HIPPARCOS,
            Catalogue::Tgas => &TGAS,
        }
    }

    /// Parallax standard error in milliarcseconds at the given apparent magnitude
    pub fn parallax_error(&self, apparent_mag: f64) -> f64 {
        let model = self.model();
        model.parallax_floor * model.growth(apparent_mag)
    }

    /// Photometric standard error in magnitudes at the given apparent magnitude
    pub fn magnitude_error(&self, apparent_mag: f64) -> f64 {
        let model = self.model();
        model.magnitude_floor * model.growth(apparent_mag)
    }

    /// Faintest apparent magnitude reached by the catalogue
    pub fn magnitude_limit(&self) -> f64 {
        self.model().faint_limit
    }
}
