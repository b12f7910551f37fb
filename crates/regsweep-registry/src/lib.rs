//! Registry collaborators for regsweep
//!
//! This crate provides:
//! - The [`ImageSource`] and [`ImageDeleter`] seams the CLI talks to
//! - [`EcrCli`], an Amazon ECR backend driven through the `aws` CLI
//! - [`SnapshotSource`], an offline source reading saved `describe-images` output
//! - [`Executor`], which applies a repository plan or logs it in dry-run mode
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use regsweep_core::{plan_repository, PolicyConfig};
//! use regsweep_registry::{EcrCli, Executor, ImageSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ecr = EcrCli::new("us-east-1")?;
//!     let policy = PolicyConfig::default();
//!     let executor = Executor::new(&ecr, policy.dry_run);
//!
//!     for repository in ecr.list_repositories().await? {
//!         let images = ecr.list_images(&repository).await?;
//!         let plan = plan_repository(&repository, &images, &policy, Utc::now())?;
//!         executor.execute(&plan).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod ecr;
pub mod executor;
pub mod snapshot;
pub mod traits;
pub mod wire;

pub use ecr::EcrCli;
pub use executor::{ExecutionReport, Executor};
pub use snapshot::SnapshotSource;
pub use traits::{DeleteFailure, DeleteOutcome, ImageDeleter, ImageSource};
