//! Curve fitting.
//!
//! Responsibilities:
//!
//! - generic Levenberg–Marquardt least squares (`fitter`)
//! - fitting the development curve to a pattern and classifying the outcome (`outcome`)

pub mod fitter;
pub mod outcome;

pub use fitter::*;
pub use outcome::*;
