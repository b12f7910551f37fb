//! Configuration loading and settings types

mod loader;
mod settings;

pub use loader::{ConfigLoader, ENV_PREFIX};
pub use settings::{PolicyOverlay, PolicySettings, SettingsOverlay, SweepSettings};
