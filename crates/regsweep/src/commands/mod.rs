//! Command implementations

pub mod config;
pub mod sweep;
pub mod version;
