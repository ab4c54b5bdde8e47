//! Reporting utilities: formatted terminal output for `acph fit`.

pub mod format;

pub use format::*;
