//! # regsweep-core
//!
//! Core library for the regsweep CLI providing:
//! - Image and decision types shared by the registry backends and the CLI
//! - The retention policy engine (global top-N and per-prefix variants)
//! - Hierarchical configuration loading (embedded defaults, files, environment)

pub mod config;
pub mod error;
pub mod policy;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, SweepSettings};
pub use error::{Error, Result};
pub use policy::{evaluate, plan_repository};
pub use types::{
    Action, Decision, ImageRecord, PolicyConfig, PolicyVariant, Reason, RepositoryPlan,
};
pub use utils::get_home_dir;
