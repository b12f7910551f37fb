//! Amazon ECR backend driven through the `aws` CLI
//!
//! Credentials and profiles are resolved by the CLI itself (environment,
//! `~/.aws/config`, SSO). The CLI also follows `nextToken` pagination for the
//! describe calls, so every call here returns the complete listing.

use crate::traits::{DeleteFailure, DeleteOutcome, ImageDeleter, ImageSource};
use crate::wire::{BatchDeleteImageOutput, DescribeImagesOutput, DescribeRepositoriesOutput};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regsweep_core::ImageRecord;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Maximum number of image ids ECR accepts per `batch-delete-image` call
pub const BATCH_DELETE_LIMIT: usize = 100;

/// ECR client that shells out to `aws ecr`
#[derive(Debug, Clone)]
pub struct EcrCli {
    aws_path: PathBuf,
    region: String,
}

impl EcrCli {
    /// Create a client for `region`
    ///
    /// # Errors
    /// Returns an error if the `aws` CLI is not found in PATH
    pub fn new(region: impl Into<String>) -> Result<Self> {
        let aws_path = which::which("aws").context(
            "aws CLI not found in PATH. Install from: https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html",
        )?;

        debug!("Found aws CLI at: {:?}", aws_path);

        Ok(Self::with_binary(aws_path, region))
    }

    /// Create a client using an explicit `aws` binary
    pub fn with_binary(aws_path: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self {
            aws_path: aws_path.into(),
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Arguments for `describe-repositories`
    fn describe_repositories_args(&self) -> Vec<String> {
        self.ecr_args("describe-repositories", Vec::new())
    }

    /// Arguments for `describe-images`
    fn describe_images_args(&self, repository: &str) -> Vec<String> {
        self.ecr_args(
            "describe-images",
            vec!["--repository-name".to_string(), repository.to_string()],
        )
    }

    /// Arguments for one `batch-delete-image` call
    fn batch_delete_args(&self, repository: &str, digests: &[String]) -> Vec<String> {
        let mut extra = vec![
            "--repository-name".to_string(),
            repository.to_string(),
            "--image-ids".to_string(),
        ];
        extra.extend(digests.iter().map(|d| format!("imageDigest={}", d)));
        self.ecr_args("batch-delete-image", extra)
    }

    fn ecr_args(&self, operation: &str, extra: Vec<String>) -> Vec<String> {
        let mut args = vec!["ecr".to_string(), operation.to_string()];
        args.extend(extra);
        args.extend([
            "--region".to_string(),
            self.region.clone(),
            "--output".to_string(),
            "json".to_string(),
        ]);
        args
    }

    /// Run the CLI and parse its JSON output
    async fn run_json<T: DeserializeOwned>(&self, args: &[String]) -> Result<T> {
        let mut cmd = Command::new(&self.aws_path);
        cmd.args(args);

        trace!("Running: aws {}", args.join(" "));

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to execute aws {}", args[..2].join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "aws {} failed ({}): {}",
                args[..2].join(" "),
                output.status,
                stderr.trim()
            ));
        }

        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("Failed to parse output of aws {}", args[..2].join(" ")))
    }
}

#[async_trait]
impl ImageSource for EcrCli {
    fn name(&self) -> String {
        format!("ecr ({})", self.region)
    }

    async fn list_repositories(&self) -> Result<Vec<String>> {
        let output: DescribeRepositoriesOutput =
            self.run_json(&self.describe_repositories_args()).await?;

        let names: Vec<String> = output
            .repositories
            .into_iter()
            .map(|r| r.repository_name)
            .collect();

        debug!("Found {} repositories in {}", names.len(), self.region);
        Ok(names)
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<ImageRecord>> {
        let output: DescribeImagesOutput = self
            .run_json(&self.describe_images_args(repository))
            .await
            .with_context(|| format!("Failed to describe images for {}", repository))?;

        trace!("{} has {} images", repository, output.image_details.len());
        Ok(output.into_records())
    }
}

#[async_trait]
impl ImageDeleter for EcrCli {
    /// Delete `digests` in batches of [`BATCH_DELETE_LIMIT`]
    ///
    /// A failed batch stops the run. Its digests and those of every later
    /// batch are reported as failures carrying the CLI error, while the
    /// deletions of earlier batches stay in the outcome.
    async fn delete_images(&self, repository: &str, digests: &[String]) -> Result<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();

        for (index, batch) in digests.chunks(BATCH_DELETE_LIMIT).enumerate() {
            let result: Result<BatchDeleteImageOutput> = self
                .run_json(&self.batch_delete_args(repository, batch))
                .await;

            match result {
                Ok(output) => outcome.merge(batch_outcome(output)),
                Err(e) => {
                    let remaining = &digests[index * BATCH_DELETE_LIMIT..];
                    let reason = format!("{:#}", e);
                    warn!(
                        "Batch delete in {} failed, {} images left undeleted: {}",
                        repository,
                        remaining.len(),
                        reason
                    );

                    outcome
                        .failures
                        .extend(remaining.iter().map(|digest| DeleteFailure {
                            digest: digest.clone(),
                            code: None,
                            reason: reason.clone(),
                        }));
                    break;
                }
            }
        }

        Ok(outcome)
    }
}

/// Convert a `batch-delete-image` response into an outcome
fn batch_outcome(output: BatchDeleteImageOutput) -> DeleteOutcome {
    let mut deleted: Vec<String> = output
        .image_ids
        .into_iter()
        .filter_map(|id| id.image_digest)
        .collect();
    // Deleting a digest with several tags echoes it once per tag
    let mut seen = HashSet::new();
    deleted.retain(|digest| seen.insert(digest.clone()));

    let failures = output
        .failures
        .into_iter()
        .map(|f| DeleteFailure {
            digest: f.image_id.image_digest.unwrap_or_default(),
            code: f.failure_code,
            reason: f
                .failure_reason
                .unwrap_or_else(|| "unknown failure".to_string()),
        })
        .collect();

    DeleteOutcome { deleted, failures }
}
