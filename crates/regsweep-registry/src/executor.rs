//! Applies repository plans to a registry

use crate::traits::{DeleteFailure, ImageDeleter};
use anyhow::Result;
use regsweep_core::RepositoryPlan;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// What happened when a plan was executed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub repository: String,
    pub dry_run: bool,
    /// Digests the plan marked for deletion
    pub planned: Vec<String>,
    /// Digests confirmed deleted (always empty in dry-run mode)
    pub deleted: Vec<String>,
    pub failures: Vec<DeleteFailure>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes the DELETE decisions of a plan, or only logs them in dry-run mode
pub struct Executor<'a> {
    deleter: &'a dyn ImageDeleter,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(deleter: &'a dyn ImageDeleter, dry_run: bool) -> Self {
        Self { deleter, dry_run }
    }

    /// Execute `plan`
    ///
    /// Images the registry refuses to delete are reported, not returned as
    /// errors. `Err` means the delete request itself failed.
    pub async fn execute(&self, plan: &RepositoryPlan) -> Result<ExecutionReport> {
        let planned: Vec<String> = plan.to_delete().map(|d| d.digest.clone()).collect();
        let mut report = ExecutionReport {
            repository: plan.repository.clone(),
            dry_run: self.dry_run,
            planned: planned.clone(),
            ..Default::default()
        };

        if planned.is_empty() {
            return Ok(report);
        }

        if self.dry_run {
            for digest in &planned {
                info!("Dry-run: would delete image {} from {}", digest, plan.repository);
            }
            return Ok(report);
        }

        let outcome = self.deleter.delete_images(&plan.repository, &planned).await?;

        for digest in &outcome.deleted {
            info!("[SUCCESS] Image deleted: {}", digest);
        }
        for failure in &outcome.failures {
            error!(
                "[ERROR] Error deleting image {}: {}",
                failure.digest, failure.reason
            );
        }

        report.deleted = outcome.deleted;
        report.failures = outcome.failures;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DeleteOutcome;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use regsweep_core::{Decision, ImageRecord, Reason};
    use std::sync::Mutex;

    /// Records delete calls and refuses digests listed in `refuse`
    #[derive(Default)]
    struct RecordingDeleter {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        refuse: Vec<String>,
    }

    #[async_trait]
    impl ImageDeleter for RecordingDeleter {
        async fn delete_images(
            &self,
            repository: &str,
            digests: &[String],
        ) -> Result<DeleteOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((repository.to_string(), digests.to_vec()));

            let (failed, deleted): (Vec<String>, Vec<String>) =
                digests.iter().cloned().partition(|d| self.refuse.contains(d));

            Ok(DeleteOutcome {
                deleted,
                failures: failed
                    .into_iter()
                    .map(|digest| DeleteFailure {
                        digest,
                        code: Some("ImageReferencedByManifestList".to_string()),
                        reason: "referenced by a manifest list".to_string(),
                    })
                    .collect(),
            })
        }
    }

    fn plan() -> RepositoryPlan {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let keep = ImageRecord::new("sha256:keep").with_tags(["latest"]).pushed_at(now);
        let old = ImageRecord::new("sha256:old").with_tags(["dev"]).pushed_at(now);
        let bare = ImageRecord::new("sha256:bare").pushed_at(now);

        RepositoryPlan {
            repository: "web".to_string(),
            decisions: vec![
                Decision::new(&keep, Reason::RetainedRecentMatch, now),
                Decision::new(&old, Reason::AgedOut, now),
                Decision::new(&bare, Reason::Untagged, now),
            ],
            skipped: vec![],
        }
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_deleter() {
        let deleter = RecordingDeleter::default();
        let report = Executor::new(&deleter, true).execute(&plan()).await.unwrap();

        assert!(deleter.calls.lock().unwrap().is_empty());
        assert!(report.dry_run);
        assert_eq!(report.planned, vec!["sha256:old", "sha256:bare"]);
        assert!(report.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_deletes_only_delete_decisions() {
        let deleter = RecordingDeleter::default();
        let report = Executor::new(&deleter, false).execute(&plan()).await.unwrap();

        let calls = deleter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "web");
        assert_eq!(calls[0].1, vec!["sha256:old", "sha256:bare"]);
        assert_eq!(report.deleted.len(), 2);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_reports_refused_images() {
        let deleter = RecordingDeleter {
            refuse: vec!["sha256:bare".to_string()],
            ..Default::default()
        };
        let report = Executor::new(&deleter, false).execute(&plan()).await.unwrap();

        assert_eq!(report.deleted, vec!["sha256:old"]);
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_nothing_to_delete_skips_request() {
        let mut plan = plan();
        plan.decisions.retain(|d| !d.is_delete());

        let deleter = RecordingDeleter::default();
        let report = Executor::new(&deleter, false).execute(&plan).await.unwrap();

        assert!(deleter.calls.lock().unwrap().is_empty());
        assert!(report.planned.is_empty());
    }
}
