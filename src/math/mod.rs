//! Mathematical utilities: curve kernel, finite-difference Jacobian and
//! linear least squares.

pub mod basis;
pub mod jacobian;
pub mod ols;

pub use basis::*;
pub use jacobian::*;
pub use ols::*;
