//! Resolved sweep settings and the partial overlays merged into them

use crate::error::Result;
use crate::types::{PolicyConfig, PolicyVariant};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Fully resolved settings for one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SweepSettings {
    /// AWS region of the registry
    #[serde(default)]
    pub region: Option<String>,

    /// Report deletions without executing them
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// File that receives a copy of the run log
    #[serde(default)]
    pub log_file: Option<Utf8PathBuf>,

    /// Repositories to sweep; empty means all
    #[serde(default)]
    pub repositories: Vec<String>,

    /// Retention policy parameters
    #[serde(default)]
    pub policy: PolicySettings,
}

fn default_dry_run() -> bool {
    true
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            region: None,
            dry_run: default_dry_run(),
            log_file: None,
            repositories: Vec::new(),
            policy: PolicySettings::default(),
        }
    }
}

/// Retention policy section of the settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicySettings {
    #[serde(default)]
    pub variant: PolicyVariant,

    #[serde(default)]
    pub retained_prefixes: Vec<String>,

    #[serde(default = "default_keep_per_prefix")]
    pub keep_per_prefix: u32,

    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,
}

fn default_keep_per_prefix() -> u32 {
    2
}

fn default_max_age_days() -> i64 {
    10
}

impl Default for PolicySettings {
    fn default() -> Self {
        let policy = PolicyConfig::default();
        Self {
            variant: policy.variant,
            retained_prefixes: policy.retained_prefixes,
            keep_per_prefix: policy.keep_per_prefix,
            max_age_days: policy.max_age_days,
        }
    }
}

impl SweepSettings {
    /// Build the validated policy for the engine
    ///
    /// # Errors
    /// Returns `Error::Configuration` when the policy parameters are invalid.
    pub fn policy_config(&self) -> Result<PolicyConfig> {
        let config = PolicyConfig {
            variant: self.policy.variant,
            retained_prefixes: self.policy.retained_prefixes.clone(),
            keep_per_prefix: self.policy.keep_per_prefix,
            max_age_days: self.policy.max_age_days,
            dry_run: self.dry_run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Merge `overlay` into these settings; set fields win
    pub fn apply(&mut self, overlay: SettingsOverlay) {
        if let Some(region) = overlay.region {
            self.region = Some(region);
        }
        if let Some(dry_run) = overlay.dry_run {
            self.dry_run = dry_run;
        }
        if let Some(log_file) = overlay.log_file {
            self.log_file = Some(log_file);
        }
        if let Some(repositories) = overlay.repositories {
            self.repositories = repositories;
        }
        if let Some(policy) = overlay.policy {
            self.policy.apply(policy);
        }
    }

    /// Whether `repository` is selected by the repository filter
    pub fn includes_repository(&self, repository: &str) -> bool {
        self.repositories.is_empty() || self.repositories.iter().any(|r| r == repository)
    }
}

impl PolicySettings {
    fn apply(&mut self, overlay: PolicyOverlay) {
        if let Some(variant) = overlay.variant {
            self.variant = variant;
        }
        if let Some(prefixes) = overlay.retained_prefixes {
            self.retained_prefixes = prefixes;
        }
        if let Some(keep) = overlay.keep_per_prefix {
            self.keep_per_prefix = keep;
        }
        if let Some(max_age) = overlay.max_age_days {
            self.max_age_days = max_age;
        }
    }
}

/// Partial settings from one source (file, environment, flags, prompts)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SettingsOverlay {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub dry_run: Option<bool>,
    #[serde(default)]
    pub log_file: Option<Utf8PathBuf>,
    #[serde(default)]
    pub repositories: Option<Vec<String>>,
    #[serde(default)]
    pub policy: Option<PolicyOverlay>,
}

/// Partial policy section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyOverlay {
    #[serde(default)]
    pub variant: Option<PolicyVariant>,
    #[serde(default)]
    pub retained_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub keep_per_prefix: Option<u32>,
    #[serde(default)]
    pub max_age_days: Option<i64>,
}

impl SettingsOverlay {
    /// Whether this overlay sets nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Mutable access to the policy section, creating it if missing
    pub fn policy_mut(&mut self) -> &mut PolicyOverlay {
        self.policy.get_or_insert_with(PolicyOverlay::default)
    }
}
