//! Registry collaborator traits

use anyhow::Result;
use async_trait::async_trait;
use regsweep_core::ImageRecord;
use serde::{Deserialize, Serialize};

/// Supplies repositories and their image records
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Human-readable name of the source, used in logs
    fn name(&self) -> String;

    /// List repository names
    async fn list_repositories(&self) -> Result<Vec<String>>;

    /// List every image of `repository`
    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>>;
}

/// Deletes images by digest
#[async_trait]
pub trait ImageDeleter: Send + Sync {
    /// Delete `digests` from `repository`
    ///
    /// Per-image failures are reported in the outcome; `Err` means the
    /// request as a whole could not be made.
    async fn delete_images(&self, repository: &str, digests: &[String]) -> Result<DeleteOutcome>;
}

/// Result of a delete request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    /// Digests the registry confirmed as deleted
    pub deleted: Vec<String>,
    /// Digests the registry refused to delete
    pub failures: Vec<DeleteFailure>,
}

/// One image the registry could not delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub digest: String,
    pub code: Option<String>,
    pub reason: String,
}

impl DeleteOutcome {
    /// Append another outcome, as when a request is split into batches
    pub fn merge(&mut self, other: DeleteOutcome) {
        self.deleted.extend(other.deleted);
        self.failures.extend(other.failures);
    }
}
