//! Retention policy engine
//!
//! Classifies every image of one repository as KEEP or DELETE. The engine is
//! a pure function of the image list, the policy and an explicit `now`; it
//! never reads the clock and never touches a registry.
//!
//! Two variants are available, selected by [`PolicyConfig::variant`]:
//!
//! - [`PolicyVariant::Global`]: the newest `keep_per_prefix` images among all
//!   prefix matches are kept, every other match is deleted. Untagged images are
//!   deleted; tagged images matching no prefix are left alone.
//! - [`PolicyVariant::PerPrefix`]: the newest `keep_per_prefix` images of each
//!   prefix group are kept (an image kept by any group is kept). Everything
//!   else is deleted when untagged or older than `max_age_days`.
//!
//! Images without a push timestamp are excluded from the output under both
//! variants.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use regsweep_core::{evaluate, Action, ImageRecord, PolicyConfig};
//!
//! let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
//! let images = vec![
//!     ImageRecord::new("sha256:aaa").with_tags(["latest"]).pushed_at(now),
//!     ImageRecord::new("sha256:bbb").pushed_at(now - Duration::days(1)),
//! ];
//!
//! let decisions = evaluate(&images, &PolicyConfig::default(), now).unwrap();
//! assert_eq!(decisions[0].action, Action::Keep);
//! assert_eq!(decisions[1].action, Action::Delete);
//! ```

mod global;
mod per_prefix;

use crate::error::Result;
use crate::types::{Decision, ImageRecord, PolicyConfig, PolicyVariant, Reason, RepositoryPlan};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, trace};

pub use global::GlobalRanking;
pub use per_prefix::PerPrefixRanking;

/// A retention algorithm
///
/// Implementations receive only images with a known push timestamp and unique
/// digests, and return one reason per image, in the same order.
pub trait RetentionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Classify `images` under `config`
    fn classify(
        &self,
        images: &[&ImageRecord],
        config: &PolicyConfig,
        now: DateTime<Utc>,
    ) -> Vec<Reason>;
}

/// Strategy implementing the given variant
pub fn strategy_for(variant: PolicyVariant) -> &'static dyn RetentionStrategy {
    match variant {
        PolicyVariant::Global => &GlobalRanking,
        PolicyVariant::PerPrefix => &PerPrefixRanking,
    }
}

/// Decide KEEP or DELETE for each image
///
/// Decisions come back in input order. Images without a push timestamp get
/// no decision; if a digest occurs more than once only its first record is
/// evaluated.
///
/// # Errors
/// Returns `Error::Configuration` if `config` violates the policy invariants.
/// No image is examined in that case.
pub fn evaluate(
    images: &[ImageRecord],
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Decision>> {
    config.validate()?;

    let candidates = evaluable(images);
    let strategy = strategy_for(config.variant);
    trace!(
        "Evaluating {} of {} images with the {} strategy",
        candidates.len(),
        images.len(),
        strategy.name()
    );

    let reasons = strategy.classify(&candidates, config, now);
    debug_assert_eq!(reasons.len(), candidates.len());

    Ok(candidates
        .into_iter()
        .zip(reasons)
        .map(|(image, reason)| Decision::new(image, reason, now))
        .collect())
}

/// Evaluate one repository and collect the digests skipped for missing metadata
pub fn plan_repository(
    repository: impl Into<String>,
    images: &[ImageRecord],
    config: &PolicyConfig,
    now: DateTime<Utc>,
) -> Result<RepositoryPlan> {
    let repository = repository.into();
    let decisions = evaluate(images, config, now)?;

    // A digest is skipped only if none of its records produced a decision
    let mut seen: HashSet<&str> = decisions.iter().map(|d| d.digest.as_str()).collect();
    let skipped: Vec<String> = images
        .iter()
        .filter(|img| img.pushed_at.is_none())
        .filter(|img| seen.insert(img.digest.as_str()))
        .map(|img| img.digest.clone())
        .collect();

    debug!(
        "Planned {}: {} decisions, {} skipped",
        repository,
        decisions.len(),
        skipped.len()
    );

    Ok(RepositoryPlan {
        repository,
        decisions,
        skipped,
    })
}

/// Images with a push timestamp, first record per digest
fn evaluable(images: &[ImageRecord]) -> Vec<&ImageRecord> {
    let mut seen = HashSet::new();
    images
        .iter()
        .filter(|img| img.pushed_at.is_some())
        .filter(|img| {
            let first = seen.insert(img.digest.as_str());
            if !first {
                trace!("Ignoring duplicate record for {}", img.digest);
            }
            first
        })
        .collect()
}

/// Newest first; equal push times fall back to the smaller digest
pub(crate) fn by_recency(a: &ImageRecord, b: &ImageRecord) -> Ordering {
    b.pushed_at
        .cmp(&a.pushed_at)
        .then_with(|| a.digest.cmp(&b.digest))
}

/// Digests of the `n` newest images in `group`
pub(crate) fn most_recent<'a>(mut group: Vec<&'a ImageRecord>, n: u32) -> HashSet<&'a str> {
    group.sort_by(|a, b| by_recency(a, b));
    group
        .into_iter()
        .take(n as usize)
        .map(|img| img.digest.as_str())
        .collect()
}

#[cfg(test)]
mod tests;
