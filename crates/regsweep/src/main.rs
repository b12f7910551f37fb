//! regsweep CLI - container registry image retention
//!
//! This is the main entry point for the regsweep command-line interface.

mod cli;
mod commands;
mod output;
mod prompt;
mod version;

use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version(args) => {
            init_tracing(cli.verbose, cli.quiet, None)?;
            commands::version::run(args)
        }
        Commands::Config(cmd) => {
            init_tracing(cli.verbose, cli.quiet, None)?;
            commands::config::run(cmd, cli.config.as_deref())
        }
        Commands::Run(args) => {
            // Settings decide the log file, so tracing starts after they resolve
            let settings = commands::sweep::resolve_settings(
                &args.sweep,
                args.dry_run_flag(),
                cli.config.as_deref(),
            )?;
            init_tracing(cli.verbose, cli.quiet, settings.log_file.as_deref())?;
            commands::sweep::run(args, settings).await
        }
        Commands::Plan(args) => {
            let settings =
                commands::sweep::resolve_settings(&args.sweep, Some(true), cli.config.as_deref())?;
            init_tracing(cli.verbose, cli.quiet, settings.log_file.as_deref())?;
            commands::sweep::plan(args, settings).await
        }
    }
}

/// Initialize tracing with appropriate verbosity
///
/// Per-image decision lines only reach the console at `-v` and above, but
/// are always written to the log file.
fn init_tracing(verbose: u8, quiet: bool, log_file: Option<&Utf8Path>) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(format!(
                "info,{}=warn",
                commands::sweep::DECISION_TARGET
            )),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(EnvFilter::new("info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .init();

    Ok(())
}
