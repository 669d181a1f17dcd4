//! Numerical building blocks shared by the models, sampler and estimators

pub mod integrate;
pub mod lookup_table;
pub mod stats;

pub use integrate::simpson;
pub use lookup_table::LookupTable;
pub use stats::{mean, normal_cdf, normal_ln_pdf, quantile, std_dev};
