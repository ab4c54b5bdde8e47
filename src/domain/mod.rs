//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw source records (`PolicyRecord`, `ClaimRecord`)
//! - aggregated rows (`ExposureRecord`, `ClaimsDevRecord`, `AcphRow`)
//! - pattern and fit outputs (`PatternPoint`, `FittedParameters`)
//! - the persisted exclusion identity (`ExcludedPoint`)

pub mod types;

pub use types::*;
