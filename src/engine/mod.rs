//! The development-pattern engine.
//!
//! Data flows one way:
//!
//! raw records → `aggregate` (ACPH table) → `select` (mask applied to one
//! product view) → `pattern` (average by development year) → `crate::fit`.

pub mod aggregate;
pub mod pattern;
pub mod select;

pub use aggregate::*;
pub use pattern::*;
pub use select::*;
