//! Version information for the regsweep CLI

use serde::{Deserialize, Serialize};

/// Version information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,

    /// Git commit SHA (short)
    pub commit: Option<String>,

    pub build_date: Option<String>,
}

impl VersionInfo {
    /// Create version info for current build
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("GIT_SHA").map(String::from),
            build_date: option_env!("BUILD_DATE").map(String::from),
        }
    }

    /// Format as display string
    pub fn display(&self) -> String {
        match &self.commit {
            Some(commit) => format!("regsweep {} ({})", self.version, commit),
            None => format!("regsweep {}", self.version),
        }
    }
}
