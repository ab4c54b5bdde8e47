//! Data sources: the shared dataset and the synthetic demo generator.

pub mod dataset;
pub mod sample;

pub use dataset::*;
pub use sample::*;
