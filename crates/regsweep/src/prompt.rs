//! Interactive collection of run settings

use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use regsweep_core::config::SettingsOverlay;
use regsweep_core::utils::split_list;
use regsweep_core::SweepSettings;

/// Ask for region, retention period, prefixes and dry-run mode
///
/// Each prompt is pre-filled with the value resolved from config, environment
/// and flags.
pub fn collect(current: &SweepSettings) -> Result<SettingsOverlay> {
    let mut overlay = SettingsOverlay::default();

    let mut region = Input::<String>::new().with_prompt("AWS Region (e.g., us-east-1)");
    if let Some(existing) = &current.region {
        region = region.default(existing.clone());
    }
    let region = region.interact_text().context("Failed to read region")?;
    overlay.region = Some(region.trim().to_string());

    let max_age: i64 = Input::new()
        .with_prompt("Retention period in days (e.g., 10)")
        .default(current.policy.max_age_days)
        .interact_text()
        .context("Failed to read retention period")?;
    overlay.policy_mut().max_age_days = Some(max_age);

    let prefixes: String = Input::new()
        .with_prompt("Comma-separated tag prefixes to keep (e.g., latest,dev,main)")
        .default(current.policy.retained_prefixes.join(","))
        .allow_empty(true)
        .interact_text()
        .context("Failed to read tag prefixes")?;
    overlay.policy_mut().retained_prefixes = Some(split_list(&prefixes));

    let dry_run = Confirm::new()
        .with_prompt("Dry-run mode?")
        .default(current.dry_run)
        .interact()
        .context("Failed to read dry-run choice")?;
    overlay.dry_run = Some(dry_run);

    Ok(overlay)
}
