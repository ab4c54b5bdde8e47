//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves configuration
//! - installs logging
//! - loads the dataset and builds a session
//! - dispatches to the TUI or a one-shot command

use clap::Parser;
use tracing::warn;

use crate::app::session::Session;
use crate::cli::{Cli, Command, DemoArgs, FitArgs, PlotArgs, SaveArgs, SolverArgs, TuiArgs};
use crate::config::AppConfig;
use crate::data::{Dataset, SampleConfig, generate_sample, write_sample};
use crate::engine::ExclusionMask;
use crate::error::AppError;
use crate::fit::{FitOptions, SolverOptions};
use crate::io::assumptions::AssumptionStore;
use crate::io::curve::{CurveFile, read_curve_json, write_curve_json};
use crate::io::export::write_rows_csv;
use crate::logging::LogTarget;

pub mod pipeline;
pub mod session;

/// Entry point for the `acph` binary.
pub fn run() -> Result<(), AppError> {
    // `acph` and `acph --data-dir x` behave like `acph tui ...`. Clap requires a
    // subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let config = AppConfig::from_env().with_overrides(cli.data_dir.clone(), cli.assumptions.clone());

    let target = match &cli.command {
        Command::Tui(_) => config.log_file.clone().map(LogTarget::File).unwrap_or(LogTarget::Off),
        _ => LogTarget::Stderr,
    };
    crate::logging::init(cli.verbose, target)?;

    match cli.command {
        Command::Tui(args) => handle_tui(args, &config),
        Command::Fit(args) => handle_fit(args, &config),
        Command::Save(args) => handle_save(args, &config),
        Command::Demo(args) => handle_demo(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn fit_options(args: &SolverArgs) -> FitOptions {
    let defaults = SolverOptions::default();
    FitOptions {
        solver: SolverOptions {
            max_evaluations: args.max_evals.unwrap_or(defaults.max_evaluations),
            ..defaults
        },
        ..FitOptions::default()
    }
}

fn open_session(config: &AppConfig, opts: FitOptions) -> Result<Session, AppError> {
    let dataset = Dataset::load(config.data_dir.as_deref())?;
    let store = AssumptionStore::new(&config.assumptions);
    Ok(Session::new(dataset, store, opts))
}

/// Merge explicit row positions into the session mask, warning about stale ones.
fn apply_exclusions(session: &mut Session, positions: &[usize]) {
    let rows = session.analysis().view.len();
    let stale: Vec<usize> = positions.iter().copied().filter(|&p| p >= rows).collect();
    if !stale.is_empty() {
        warn!(?stale, rows, "ignoring row positions outside the product view");
    }
    let mut mask: ExclusionMask = session.mask().clone();
    for &p in positions {
        mask.insert(p);
    }
    session.set_mask(mask);
}

fn handle_tui(args: TuiArgs, config: &AppConfig) -> Result<(), AppError> {
    let mut session = open_session(config, fit_options(&args.solver))?;
    if let Some(product) = args.product {
        session.select_product(product);
    }
    crate::tui::run(session)
}

fn handle_fit(args: FitArgs, config: &AppConfig) -> Result<(), AppError> {
    let mut session = open_session(config, fit_options(&args.solver))?;
    session.select_product(args.product);

    if args.use_saved {
        let report = session.load_saved_exclusions()?;
        if !report.missing.is_empty() {
            eprintln!(
                "note: {} saved exclusions no longer match a row and were ignored",
                report.missing.len()
            );
        }
    }
    apply_exclusions(&mut session, &args.exclude);

    let analysis = session.analysis();
    println!("{}", crate::report::format_analysis(session.dataset(), analysis));

    if args.plot {
        let plot = crate::plot::render_ascii_plot(&analysis.labeled, analysis.fit.params(), args.width, args.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        write_rows_csv(path, &analysis.labeled)?;
    }
    if let Some(path) = &args.export_curve {
        let Some(params) = analysis.fit.params() else {
            return Err(AppError::no_data(format!(
                "No fitted curve to export for {} ({}).",
                analysis.product,
                analysis.fit.status_label()
            )));
        };
        let excluded = crate::engine::excluded_points(&analysis.view, &analysis.mask);
        write_curve_json(path, &CurveFile::new(analysis.product, *params, excluded))?;
    }

    Ok(())
}

fn handle_save(args: SaveArgs, config: &AppConfig) -> Result<(), AppError> {
    let mut session = open_session(config, FitOptions::default())?;
    session.select_product(args.product);
    apply_exclusions(&mut session, &args.exclude);

    let report = session.save_exclusions()?;
    println!("{}", report.message());
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let sample_config = SampleConfig {
        seed: args.seed,
        policies: args.policies,
        ..SampleConfig::default()
    };
    let sample = generate_sample(&sample_config)?;
    write_sample(&args.out, &sample)?;
    println!(
        "Wrote {} policies and {} claims to {}",
        sample.policies.len(),
        sample.claims.len(),
        args.out.display()
    );
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = read_curve_json(&args.curve)?;
    let plot = crate::plot::render_ascii_plot_from_curve_file(&curve, args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Rewrite argv so `acph` defaults to `acph tui`.
///
/// Rules:
/// - `acph`                        -> `acph tui`
/// - `acph --data-dir x ...`       -> `acph tui --data-dir x ...`
/// - `acph --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "fit" | "save" | "demo" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["acph"])), args(&["acph", "tui"]));
        assert_eq!(
            rewrite_args(args(&["acph", "--data-dir", "d"])),
            args(&["acph", "tui", "--data-dir", "d"])
        );
    }

    #[test]
    fn subcommands_and_help_untouched() {
        assert_eq!(rewrite_args(args(&["acph", "fit", "-p", "flat"])), args(&["acph", "fit", "-p", "flat"]));
        assert_eq!(rewrite_args(args(&["acph", "--help"])), args(&["acph", "--help"]));
    }

    #[test]
    fn max_evals_flag_reaches_solver() {
        let opts = fit_options(&SolverArgs { max_evals: Some(50) });
        assert_eq!(opts.solver.max_evaluations, 50);
        assert_eq!(fit_options(&SolverArgs::default()), FitOptions::default());
    }

    #[test]
    fn exclusions_merge_and_stale_positions_drop() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: Some(dir.path().to_path_buf()),
            assumptions: dir.path().join("assumptions.json"),
            log_file: None,
        };
        let sample = generate_sample(&SampleConfig {
            policies: 60,
            ..SampleConfig::default()
        })
        .unwrap();
        write_sample(dir.path(), &sample).unwrap();

        let mut session = open_session(&config, FitOptions::default()).unwrap();
        let rows = session.analysis().view.len();
        assert!(rows > 2);
        apply_exclusions(&mut session, &[0, rows + 5]);
        apply_exclusions(&mut session, &[1]);
        assert_eq!(session.mask(), &ExclusionMask::from_positions([0, 1]));
    }
}
