//! Command-line parsing for the ACPH development curve tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the aggregation/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ProductType;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "acph", version, about = "Claims development (ACPH) curve fitter")]
pub struct Cli {
    /// Directory holding Policy_Book.csv and Claims_Transaction.csv (overrides ACPH_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Assumption file for saved exclusions (overrides ACPH_ASSUMPTIONS).
    #[arg(long, global = true, value_name = "JSON")]
    pub assumptions: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive excluder (default).
    Tui(TuiArgs),
    /// Fit one product's curve and print rows, pattern and parameters.
    Fit(FitArgs),
    /// Persist exclusions for one product.
    Save(SaveArgs),
    /// Write a synthetic policy book and claims file.
    Demo(DemoArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
}

/// Solver knobs shared by commands that fit.
#[derive(Debug, Args, Clone, Default)]
pub struct SolverArgs {
    /// Cap on model evaluations per fit.
    #[arg(long, value_name = "N")]
    pub max_evals: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// Product to open on (defaults to the first product with data).
    #[arg(short = 'p', long, value_enum)]
    pub product: Option<ProductType>,

    #[command(flatten)]
    pub solver: SolverArgs,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Product to fit.
    #[arg(short = 'p', long, value_enum)]
    pub product: ProductType,

    /// Row positions (0-based, in the product view) to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "I,J,...")]
    pub exclude: Vec<usize>,

    /// Start from the exclusions saved in the assumption file.
    #[arg(long)]
    pub use_saved: bool,

    /// Render an ASCII plot of points and curve.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export labelled rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export curve (parameters + exclusions + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    #[command(flatten)]
    pub solver: SolverArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SaveArgs {
    /// Product whose exclusions are replaced.
    #[arg(short = 'p', long, value_enum)]
    pub product: ProductType,

    /// Row positions (0-based, in the product view) to exclude; omit to clear.
    #[arg(long, value_delimiter = ',', value_name = "I,J,...")]
    pub exclude: Vec<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Output directory for the two CSV files.
    #[arg(long, value_name = "DIR")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of policies to generate.
    #[arg(long, default_value_t = 400)]
    pub policies: usize,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Curve JSON file produced by `acph fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}
