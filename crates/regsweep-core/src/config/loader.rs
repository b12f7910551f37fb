//! Hierarchical configuration loader with precedence
//!
//! Loads settings from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Global config (~/.regsweep/config.yaml)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (REGSWEEP_* prefix, AWS_REGION for the region)
//! 5. CLI flags and interactive prompts (applied by the caller)

use super::settings::{SettingsOverlay, SweepSettings};
use crate::error::{Error, Result};
use crate::types::PolicyVariant;
use crate::utils::{get_home_dir, parse_bool_flag, split_list};
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use std::fs;
use tracing::debug;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "REGSWEEP_";

const DEFAULTS_FILE: &str = "defaults.yaml";
const GLOBAL_CONFIG_FILE: &str = "config.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Configuration hierarchy loader
pub struct ConfigLoader {
    /// Directory holding the global config file, if one could be determined
    config_dir: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader rooted at ~/.regsweep
    pub fn new() -> Self {
        let config_dir = get_home_dir()
            .ok()
            .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
            .map(|home| home.join(".regsweep"));
        Self { config_dir }
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config_dir: Some(config_dir.into()),
        }
    }

    /// Path of the global config file
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(GLOBAL_CONFIG_FILE))
    }

    /// Load settings from defaults, config files and the process environment
    pub fn load(&self, explicit: Option<&Utf8Path>) -> Result<SweepSettings> {
        self.load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Load settings using `lookup` in place of the process environment
    pub fn load_with_env<F>(&self, explicit: Option<&Utf8Path>, lookup: F) -> Result<SweepSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::embedded_defaults()?;

        if let Some(global) = self.global_config_path() {
            if global.exists() {
                debug!("Loading global config from {}", global);
                settings.apply(Self::load_overlay_file(&global)?);
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::config_not_found(path.as_str()));
            }
            debug!("Loading config from {}", path);
            settings.apply(Self::load_overlay_file(path)?);
        }

        let env = overlay_from_env(lookup)?;
        if !env.is_empty() {
            debug!("Applying environment overrides");
            settings.apply(env);
        }

        Ok(settings)
    }

    /// Raw text of the embedded defaults, used by `config init`
    pub fn default_config_yaml() -> Result<String> {
        let file = EmbeddedConfigs::get(DEFAULTS_FILE).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", DEFAULTS_FILE))
        })?;

        std::str::from_utf8(&file.data)
            .map(str::to_string)
            .map_err(|_| {
                Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", DEFAULTS_FILE))
            })
    }

    /// Parse the embedded defaults
    pub fn embedded_defaults() -> Result<SweepSettings> {
        let content = Self::default_config_yaml()?;
        serde_yaml_ng::from_str(&content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                DEFAULTS_FILE, e
            ))
        })
    }

    /// Load a YAML file as a partial overlay
    fn load_overlay_file(path: &Utf8Path) -> Result<SettingsOverlay> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(SettingsOverlay::default());
        }
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an overlay from REGSWEEP_* variables (and AWS_REGION for the region)
fn overlay_from_env<F>(lookup: F) -> Result<SettingsOverlay>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| {
        lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
    };

    let mut overlay = SettingsOverlay {
        region: var("REGION")
            .or_else(|| lookup("AWS_REGION"))
            .or_else(|| lookup("AWS_DEFAULT_REGION"))
            .filter(|v| !v.trim().is_empty()),
        log_file: var("LOG_FILE").map(Utf8PathBuf::from),
        repositories: var("REPOSITORIES").map(|v| split_list(&v)),
        ..Default::default()
    };

    if let Some(raw) = var("DRY_RUN") {
        overlay.dry_run = Some(parse_bool_flag(&raw).ok_or_else(|| {
            Error::invalid_config(format!("{}DRY_RUN must be yes or no, got '{}'", ENV_PREFIX, raw))
        })?);
    }

    if let Some(raw) = var("VARIANT") {
        overlay.policy_mut().variant = Some(raw.parse::<PolicyVariant>()?);
    }

    if let Some(raw) = var("PREFIXES") {
        overlay.policy_mut().retained_prefixes = Some(split_list(&raw));
    }

    if let Some(raw) = var("KEEP_PER_PREFIX") {
        overlay.policy_mut().keep_per_prefix = Some(parse_number(&raw, "KEEP_PER_PREFIX")?);
    }

    if let Some(raw) = var("MAX_AGE_DAYS") {
        overlay.policy_mut().max_age_days = Some(parse_number(&raw, "MAX_AGE_DAYS")?);
    }

    Ok(overlay)
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        Error::invalid_config(format!(
            "{}{} must be an integer, got '{}'",
            ENV_PREFIX, name, raw
        ))
    })
}
