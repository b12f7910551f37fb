//! Offline image source backed by saved `describe-images` output
//!
//! The snapshot file is a JSON object mapping each repository name to the
//! output of `aws ecr describe-images` for that repository:
//!
//! ```json
//! {
//!   "web": { "imageDetails": [ { "imageDigest": "sha256:...", "imageTags": ["latest"],
//!                                "imagePushedAt": "2024-05-20T08:30:00+00:00" } ] }
//! }
//! ```

use crate::traits::{DeleteOutcome, ImageDeleter, ImageSource};
use crate::wire::DescribeImagesOutput;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use regsweep_core::ImageRecord;
use std::collections::BTreeMap;
use tracing::debug;

/// Image source reading a snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: Utf8PathBuf,
    repositories: BTreeMap<String, Vec<ImageRecord>>,
}

impl SnapshotSource {
    /// Load a snapshot from `path`
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path))?;
        let mut source = Self::from_json(&content)
            .with_context(|| format!("Failed to parse snapshot {}", path))?;
        source.path = path.to_owned();

        debug!(
            "Loaded snapshot {} with {} repositories",
            path,
            source.repositories.len()
        );
        Ok(source)
    }

    /// Parse snapshot JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, DescribeImagesOutput> = serde_json::from_str(content)?;
        let repositories = raw
            .into_iter()
            .map(|(name, output)| (name, output.into_records()))
            .collect();

        Ok(Self {
            path: Utf8PathBuf::from("<memory>"),
            repositories,
        })
    }
}

#[async_trait]
impl ImageSource for SnapshotSource {
    fn name(&self) -> String {
        format!("snapshot ({})", self.path)
    }

    async fn list_repositories(&self) -> Result<Vec<String>> {
        Ok(self.repositories.keys().cloned().collect())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>> {
        self.repositories
            .get(repository)
            .cloned()
            .ok_or_else(|| anyhow!("Repository {} not found in snapshot", repository))
    }
}

#[async_trait]
impl ImageDeleter for SnapshotSource {
    async fn delete_images(&self, repository: &str, digests: &[String]) -> Result<DeleteOutcome> {
        bail!(
            "Cannot delete {} images from {}: snapshot {} is read-only",
            digests.len(),
            repository,
            self.path
        )
    }
}
