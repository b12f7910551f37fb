//! Retention policy parameters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which retention algorithm to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyVariant {
    /// Keep the N most recent images across all prefix matches combined;
    /// every other match and every untagged image is deleted
    Global,

    /// Keep the N most recent images per retained prefix, then apply the
    /// age cutoff to everything else
    #[default]
    PerPrefix,
}

impl PolicyVariant {
    /// Whether the variant cannot work without at least one retained prefix
    pub fn requires_prefixes(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for PolicyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::PerPrefix => write!(f, "per-prefix"),
        }
    }
}

impl FromStr for PolicyVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "a" => Ok(Self::Global),
            "per-prefix" | "per_prefix" | "b" => Ok(Self::PerPrefix),
            other => Err(Error::configuration(format!(
                "unknown policy variant '{}' (expected 'global' or 'per-prefix')",
                other
            ))),
        }
    }
}

/// Immutable parameters for one evaluation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyConfig {
    /// Active retention algorithm
    #[serde(default)]
    pub variant: PolicyVariant,

    /// Tag prefixes whose most recent images are retained
    #[serde(default)]
    pub retained_prefixes: Vec<String>,

    /// Number of most recent matching images to keep (per prefix group, or
    /// overall for the global variant)
    pub keep_per_prefix: u32,

    /// Images older than this many days are deletion candidates
    pub max_age_days: i64,

    /// Report decisions without deleting anything; the engine ignores this
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            variant: PolicyVariant::default(),
            retained_prefixes: vec!["latest".to_string(), "dev".to_string(), "main".to_string()],
            keep_per_prefix: 2,
            max_age_days: 10,
            dry_run: true,
        }
    }
}

impl PolicyConfig {
    /// Check the policy invariants
    ///
    /// # Errors
    /// Returns `Error::Configuration` when keep-per-prefix is zero, the age
    /// threshold is negative, a prefix is blank, or the active variant needs
    /// prefixes and none are configured.
    pub fn validate(&self) -> Result<()> {
        if self.keep_per_prefix < 1 {
            return Err(Error::configuration(format!(
                "keep-per-prefix must be at least 1 (got {})",
                self.keep_per_prefix
            )));
        }

        if self.max_age_days < 0 {
            return Err(Error::configuration(format!(
                "max-age-days must not be negative (got {})",
                self.max_age_days
            )));
        }

        if self.retained_prefixes.iter().any(|p| p.is_empty()) {
            return Err(Error::configuration(
                "retained prefixes must not contain empty strings",
            ));
        }

        if self.variant.requires_prefixes() && self.retained_prefixes.is_empty() {
            return Err(Error::configuration(format!(
                "the {} variant requires at least one retained prefix",
                self.variant
            )));
        }

        Ok(())
    }
}
