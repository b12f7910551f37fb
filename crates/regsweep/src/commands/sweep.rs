//! Run and plan commands
//!
//! Both commands resolve settings, list repositories from the selected
//! backend, evaluate the retention policy per repository and hand the plans
//! to the executor. `plan` always runs in dry-run mode.

use crate::cli::{PlanArgs, RunArgs, SweepArgs};
use crate::{output, prompt};
use anyhow::{anyhow, bail, Context, Result};
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use dialoguer::Confirm;
use regsweep_core::{
    plan_repository, Action, ConfigLoader, PolicyConfig, Reason, RepositoryPlan, SweepSettings,
};
use regsweep_registry::{
    EcrCli, ExecutionReport, Executor, ImageDeleter, ImageSource, SnapshotSource,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Target for per-image decision lines; kept out of the console by default
pub const DECISION_TARGET: &str = "decisions";

/// Resolve settings from config files, environment, flags and prompts
pub fn resolve_settings(
    args: &SweepArgs,
    dry_run_flag: Option<bool>,
    config_path: Option<&Utf8Path>,
) -> Result<SweepSettings> {
    let mut settings = ConfigLoader::new().load(config_path)?;
    settings.apply(args.overlay());

    if let Some(dry_run) = dry_run_flag {
        settings.dry_run = dry_run;
    }
    if args.no_log_file {
        settings.log_file = None;
    }

    if args.interactive {
        let answers = prompt::collect(&settings)?;
        settings.apply(answers);
    }

    Ok(settings)
}

/// Execute the `run` command
pub async fn run(args: RunArgs, settings: SweepSettings) -> Result<()> {
    let options = SweepOptions::new(&args.sweep, !args.yes);
    sweep(settings, options).await
}

/// Execute the `plan` command
pub async fn plan(args: PlanArgs, mut settings: SweepSettings) -> Result<()> {
    settings.dry_run = true;
    let options = SweepOptions::new(&args.sweep, false);
    sweep(settings, options).await
}

/// Per-invocation options that are not part of the settings
#[derive(Debug, Clone)]
struct SweepOptions {
    snapshot: Option<camino::Utf8PathBuf>,
    now: Option<DateTime<Utc>>,
    json: bool,
    confirm: bool,
}

impl SweepOptions {
    fn new(args: &SweepArgs, confirm: bool) -> Self {
        Self {
            snapshot: args.snapshot.clone(),
            now: args.now,
            json: args.json,
            confirm,
        }
    }
}

/// Where images come from and where deletions go
enum Backend {
    Ecr(EcrCli),
    Snapshot(SnapshotSource),
}

impl Backend {
    fn open(settings: &SweepSettings, snapshot: Option<&Utf8Path>) -> Result<Self> {
        if let Some(path) = snapshot {
            if !settings.dry_run {
                bail!(
                    "Snapshots are read-only.\n\n\
                     Rerun with --dry-run, or use `regsweep plan --snapshot {}`",
                    path
                );
            }
            return Ok(Self::Snapshot(SnapshotSource::load(path)?));
        }

        let region = settings
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No AWS region configured.\n\n\
                     Pass --region, set REGSWEEP_REGION or AWS_REGION, \
                     add `region:` to the config file, or use --interactive"
                )
            })?;

        Ok(Self::Ecr(EcrCli::new(region)?))
    }

    fn source(&self) -> &dyn ImageSource {
        match self {
            Self::Ecr(ecr) => ecr,
            Self::Snapshot(snapshot) => snapshot,
        }
    }

    fn deleter(&self) -> &dyn ImageDeleter {
        match self {
            Self::Ecr(ecr) => ecr,
            Self::Snapshot(snapshot) => snapshot,
        }
    }
}

/// Totals across all repositories of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub dry_run: bool,
    pub repositories: usize,
    pub kept: usize,
    /// Images marked for deletion
    pub planned_deletions: usize,
    /// Images actually deleted
    pub deleted: usize,
    pub skipped: usize,
    pub delete_failures: usize,
    /// Repositories whose images could not be listed
    pub listing_failures: Vec<String>,
    /// Planned repositories whose delete request failed outright
    pub execution_failures: Vec<String>,
}

impl SweepSummary {
    fn new(
        dry_run: bool,
        plans: &[RepositoryPlan],
        reports: &[ExecutionReport],
        listing_failures: Vec<String>,
        execution_failures: Vec<String>,
    ) -> Self {
        // Execution failures already have a plan
        Self {
            dry_run,
            repositories: plans.len() + listing_failures.len(),
            kept: plans.iter().map(RepositoryPlan::keep_count).sum(),
            planned_deletions: plans.iter().map(RepositoryPlan::delete_count).sum(),
            deleted: reports.iter().map(|r| r.deleted.len()).sum(),
            skipped: plans.iter().map(|p| p.skipped.len()).sum(),
            delete_failures: reports.iter().map(|r| r.failures.len()).sum(),
            listing_failures,
            execution_failures,
        }
    }

    fn failed_repositories(&self) -> usize {
        self.listing_failures.len() + self.execution_failures.len()
    }

    fn has_errors(&self) -> bool {
        self.delete_failures > 0 || self.failed_repositories() > 0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SweepOutput<'a> {
    policy: &'a PolicyConfig,
    now: DateTime<Utc>,
    plans: &'a [RepositoryPlan],
    executions: &'a [ExecutionReport],
    summary: &'a SweepSummary,
}

async fn sweep(settings: SweepSettings, options: SweepOptions) -> Result<()> {
    // Invalid policies abort before any registry call
    let policy = settings.policy_config()?;
    let now = options.now.unwrap_or_else(Utc::now);
    let backend = Backend::open(&settings, options.snapshot.as_deref())?;
    let source = backend.source();

    info!(
        "Starting cleanup on {} | Variant: {} | Keep: {} | Retention: {} days | Prefixes: {} | Dry-run: {}",
        source.name(),
        policy.variant,
        policy.keep_per_prefix,
        policy.max_age_days,
        policy.retained_prefixes.join(","),
        policy.dry_run
    );

    let repositories = select_repositories(source, &settings, options.json).await?;
    if repositories.is_empty() {
        warn!("No repositories found for {}", source.name());
        return Ok(());
    }

    let mut plans = Vec::with_capacity(repositories.len());
    let mut listing_failures = Vec::new();

    for repository in &repositories {
        info!("Processing repository: {}", repository);

        let images = match source.list_images(repository).await {
            Ok(images) => images,
            Err(e) => {
                warn!("Failed to describe images for {}: {:#}", repository, e);
                listing_failures.push(repository.clone());
                continue;
            }
        };

        if images.is_empty() {
            info!("No images found in repository {}", repository);
        }

        let plan = plan_repository(repository.as_str(), &images, &policy, now)?;
        log_plan(&plan);
        plans.push(plan);
    }

    if !options.json {
        for plan in &plans {
            print_plan(plan);
        }
    }

    let planned: usize = plans.iter().map(RepositoryPlan::delete_count).sum();
    if !policy.dry_run && planned > 0 && options.confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} images from {} repositories?",
                planned,
                plans.iter().filter(|p| p.delete_count() > 0).count()
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation; pass --yes to skip it")?;

        if !confirmed {
            output::info("Cancelled, nothing was deleted");
            return Ok(());
        }
    }

    let executor = Executor::new(backend.deleter(), policy.dry_run);
    let mut reports = Vec::with_capacity(plans.len());
    let mut execution_failures = Vec::new();
    for plan in &plans {
        match executor.execute(plan).await {
            Ok(report) => {
                if !report.is_clean() {
                    warn!(
                        "{} of {} images in {} could not be deleted",
                        report.failures.len(),
                        report.planned.len(),
                        report.repository
                    );
                }
                reports.push(report);
            }
            Err(e) => {
                error!("Failed to delete images from {}: {:#}", plan.repository, e);
                execution_failures.push(plan.repository.clone());
            }
        }
    }

    let summary = SweepSummary::new(
        policy.dry_run,
        &plans,
        &reports,
        listing_failures,
        execution_failures,
    );

    if options.json {
        let out = SweepOutput {
            policy: &policy,
            now,
            plans: &plans,
            executions: &reports,
            summary: &summary,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_summary(&summary);
    }

    info!("Cleanup completed.");

    if summary.has_errors() {
        return Err(anyhow!(
            "{} repositories failed and {} images could not be deleted",
            summary.failed_repositories(),
            summary.delete_failures
        ));
    }

    Ok(())
}

/// List repositories and apply the repository filter
async fn select_repositories(
    source: &dyn ImageSource,
    settings: &SweepSettings,
    quiet: bool,
) -> Result<Vec<String>> {
    let spinner = (!quiet).then(|| output::spinner("Listing repositories..."));
    let listed = source.list_repositories().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let listed = listed.context("Failed to list repositories")?;

    for wanted in &settings.repositories {
        if !listed.contains(wanted) {
            warn!("Repository {} not found in {}", wanted, source.name());
        }
    }

    Ok(listed
        .into_iter()
        .filter(|r| settings.includes_repository(r))
        .collect())
}

/// Log one line per decision, in the format of the cleanup log
fn log_plan(plan: &RepositoryPlan) {
    for digest in &plan.skipped {
        warn!(
            "Skipping image {} in {}: push time unknown",
            digest, plan.repository
        );
    }

    for decision in &plan.decisions {
        let age = decision
            .age_days
            .map(|a| a.to_string())
            .unwrap_or_else(|| "?".to_string());

        match decision.action {
            Action::Keep => info!(
                target: DECISION_TARGET,
                "[KEEP] Image retained ({}): {} | Age: {} days | Tags: {:?}",
                decision.reason.describe(),
                decision.digest,
                age,
                decision.tags
            ),
            Action::Delete => info!(
                target: DECISION_TARGET,
                "[DELETE] Candidate ({}): {} | Age: {} days | Tags: {:?}",
                decision.reason.describe(),
                decision.digest,
                age,
                decision.tags
            ),
        }
    }
}

fn print_plan(plan: &RepositoryPlan) {
    output::header(&format!("Repository: {}", plan.repository));

    if plan.decisions.is_empty() {
        output::info("No images to evaluate");
    } else {
        println!("{}", output::decision_table(plan));
        output::kv("Keep", &plan.keep_count().to_string());
        output::kv(
            "Delete",
            &format!(
                "{} ({} untagged, {} aged out)",
                plan.delete_count(),
                plan.count_reason(Reason::Untagged),
                plan.count_reason(Reason::AgedOut)
            ),
        );
    }

    if !plan.skipped.is_empty() {
        output::warning(&format!(
            "{} images skipped (push time unknown)",
            plan.skipped.len()
        ));
    }
}

fn print_summary(summary: &SweepSummary) {
    output::header("Summary");
    output::kv("Repositories", &summary.repositories.to_string());
    output::kv("Kept", &summary.kept.to_string());

    if summary.dry_run {
        output::kv("Would delete", &summary.planned_deletions.to_string());
    } else {
        output::kv("Deleted", &summary.deleted.to_string());
    }
    output::kv("Skipped", &summary.skipped.to_string());

    if summary.has_errors() {
        if !summary.listing_failures.is_empty() {
            output::error(&format!(
                "Could not list images: {}",
                summary.listing_failures.join(", ")
            ));
        }
        if !summary.execution_failures.is_empty() {
            output::error(&format!(
                "Delete requests failed: {}",
                summary.execution_failures.join(", ")
            ));
        }
        if summary.delete_failures > 0 {
            output::error(&format!(
                "{} images could not be deleted",
                summary.delete_failures
            ));
        }
    } else if summary.dry_run {
        output::success("Dry run complete, nothing was deleted");
    } else {
        output::success("Cleanup complete");
    }
}
