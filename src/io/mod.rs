//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - the persisted exclusion document (`assumptions`)
//! - labelled row exports (`export`)
//! - curve JSON read/write (`curve`)

pub mod assumptions;
pub mod curve;
pub mod export;
pub mod ingest;

pub use assumptions::*;
pub use curve::*;
pub use export::*;
pub use ingest::*;
