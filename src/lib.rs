//! `acph-curves` library crate.
//!
//! The binary (`acph`) is a thin wrapper around this library so that:
//!
//! - aggregation and fitting are testable without spawning processes
//! - the TUI and the one-shot commands share one session model
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
