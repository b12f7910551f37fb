//! Type definitions for image records, retention policy parameters, and decisions

mod decision;
mod image;
mod policy_types;

pub use decision::*;
pub use image::*;
pub use policy_types::*;
