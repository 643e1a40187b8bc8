//! filesame - find files with identical content
//!
//! Files are identified by the MD5 digest of their content after optional
//! ASCII case folding, whitespace removal and truncation to a byte cap.
//! Batch grouping clusters many files into classes of equal content;
//! matching compares candidates against one reference without digests.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod scanner;
pub mod signal;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;

use cli::{Cli, Commands, GroupArgs, MatchArgs, OutputFormat};
use config::Config;
use duplicates::{find_matches, EquivalenceFinder};
use error::ExitCode;
use output::{JsonMatchOutput, JsonOutput, TextOutput};
use scanner::PathInput;
use signal::ShutdownHandler;

/// Run the parsed command, writing results to standard output.
///
/// Logging must already be initialized.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the path list cannot
/// be read, the run is interrupted, or results cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

/// Run the parsed command, writing results to `out`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run_with_output<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<ExitCode> {
    let shutdown = signal::install_handler()?;
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    match cli.command {
        Commands::Group(args) => run_group(&args, config, &shutdown, out),
        Commands::Match(args) => run_match(&args, config, &shutdown, out),
    }
}

fn collect_paths(args: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    PathInput::from_args(args)
        .map_err(anyhow::Error::msg)?
        .collect()
        .context("Failed to read paths from stdin")
}

fn run_group<W: Write>(
    args: &GroupArgs,
    mut config: Config,
    shutdown: &ShutdownHandler,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    config.merge_group_args(args);
    log::debug!("Effective configuration: {:?}", config);

    let paths = collect_paths(&args.paths)?;
    let finder = EquivalenceFinder::new(
        config
            .finder_config()
            .with_shutdown_flag(shutdown.get_flag()),
    );
    let (outcome, summary) = finder.find_equivalent(paths)?;

    let exit_code = ExitCode::from_results(summary.duplicate_classes, summary.skipped_files);
    match config.output {
        OutputFormat::Text => TextOutput::new(config.separator.as_str())
            .with_print_digest(config.print_digest)
            .with_show_all(config.show_all)
            .write_classes(out, &outcome)
            .context("Failed to write results")?,
        OutputFormat::Json => JsonOutput::new(&outcome, &summary, exit_code, config.show_all)
            .write_to(out, true)
            .context("Failed to write results")?,
    }

    if summary.skipped_files > 0 {
        log::warn!("{} files could not be examined", summary.skipped_files);
    }
    Ok(exit_code)
}

fn run_match<W: Write>(
    args: &MatchArgs,
    mut config: Config,
    shutdown: &ShutdownHandler,
    out: &mut W,
) -> anyhow::Result<ExitCode> {
    config.merge_match_args(args);
    log::debug!("Effective configuration: {:?}", config);

    let paths = collect_paths(&args.paths)?;
    let match_config = config
        .match_config()
        .with_shutdown_flag(shutdown.get_flag());
    let (matches, summary) = find_matches(&args.reference, paths, &match_config)?;

    let exit_code = ExitCode::from_results(matches.len(), summary.skipped.len());
    match config.output {
        OutputFormat::Text => TextOutput::default()
            .write_matches(out, &matches)
            .context("Failed to write results")?,
        OutputFormat::Json => JsonMatchOutput::new(&args.reference, &matches, &summary, exit_code)
            .write_to(out, true)
            .context("Failed to write results")?,
    }
    Ok(exit_code)
}
