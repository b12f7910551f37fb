//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use regsweep_core::config::SettingsOverlay;
use regsweep_core::PolicyVariant;

/// regsweep - Container registry image retention
#[derive(Parser, Debug)]
#[command(name = "regsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config file (merged over ~/.regsweep/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the retention policy and delete (or, in dry-run mode, report) images
    Run(RunArgs),

    /// Show what a run would delete, without deleting anything
    Plan(PlanArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Show version information
    Version(VersionArgs),
}

/// Policy and source options shared by `run` and `plan`
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// AWS region of the registry
    #[arg(long)]
    pub region: Option<String>,

    /// Comma-separated tag prefixes to retain (e.g., latest,dev,main)
    #[arg(short, long, value_delimiter = ',')]
    pub prefixes: Option<Vec<String>>,

    /// Number of most recent matching images to keep per prefix
    #[arg(short, long)]
    pub keep: Option<u32>,

    /// Delete images older than this many days unless retained by prefix
    #[arg(short = 'a', long, allow_hyphen_values = true)]
    pub max_age_days: Option<i64>,

    /// Retention variant: global or per-prefix
    #[arg(long)]
    pub variant: Option<PolicyVariant>,

    /// Only sweep this repository (repeatable)
    #[arg(short = 'r', long = "repository")]
    pub repositories: Vec<String>,

    /// Read images from a saved describe-images snapshot instead of ECR
    #[arg(long)]
    pub snapshot: Option<Utf8PathBuf>,

    /// Evaluate ages against this instant instead of the current time (RFC 3339)
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Append the run log to this file
    #[arg(long)]
    pub log_file: Option<Utf8PathBuf>,

    /// Do not write a log file
    #[arg(long, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Prompt for region, retention period, prefixes and dry-run mode
    #[arg(short, long)]
    pub interactive: bool,
}

impl SweepArgs {
    /// Settings given on the command line
    pub fn overlay(&self) -> SettingsOverlay {
        let mut overlay = SettingsOverlay {
            region: self.region.clone(),
            log_file: self.log_file.clone(),
            repositories: (!self.repositories.is_empty()).then(|| self.repositories.clone()),
            ..Default::default()
        };

        if let Some(prefixes) = &self.prefixes {
            overlay.policy_mut().retained_prefixes = Some(
                prefixes
                    .iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect(),
            );
        }
        if let Some(keep) = self.keep {
            overlay.policy_mut().keep_per_prefix = Some(keep);
        }
        if let Some(max_age) = self.max_age_days {
            overlay.policy_mut().max_age_days = Some(max_age);
        }
        if let Some(variant) = self.variant {
            overlay.policy_mut().variant = Some(variant);
        }

        overlay
    }
}

// Run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    /// Only report what would be deleted
    #[arg(long, conflicts_with = "execute")]
    pub dry_run: bool,

    /// Delete images (overrides dry-run from config)
    #[arg(long)]
    pub execute: bool,

    /// Skip the confirmation before deleting
    #[arg(short, long)]
    pub yes: bool,
}

impl RunArgs {
    /// Dry-run mode requested on the command line, if any
    pub fn dry_run_flag(&self) -> Option<bool> {
        if self.dry_run {
            Some(true)
        } else if self.execute {
            Some(false)
        } else {
            None
        }
    }
}

// Plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show(ConfigShowArgs),

    /// Write a starter config file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path (default: ~/.regsweep/config.yaml)
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
