//! Development curve model.
//!
//! The model is implemented as small, pure functions so the fitter and the
//! presentation code share one definition of the curve.

pub mod model;

pub use model::*;
