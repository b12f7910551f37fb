//! Per-prefix top-N ranking with an age cutoff for everything else

use super::{most_recent, RetentionStrategy};
use crate::types::{ImageRecord, PolicyConfig, Reason};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::trace;

/// Keeps the newest `keep_per_prefix` images of every prefix group, then
/// deletes untagged images and images older than `max_age_days`
#[derive(Debug, Clone, Copy, Default)]
pub struct PerPrefixRanking;

impl PerPrefixRanking {
    /// Union of the per-group keep sets
    fn retained<'a>(images: &[&'a ImageRecord], config: &PolicyConfig) -> HashSet<&'a str> {
        let mut retained = HashSet::new();

        for prefix in &config.retained_prefixes {
            let group: Vec<&ImageRecord> = images
                .iter()
                .copied()
                .filter(|img| !img.is_untagged() && img.matches_prefix(prefix))
                .collect();

            let kept = most_recent(group, config.keep_per_prefix);
            trace!("Prefix '{}' retains {} images", prefix, kept.len());
            retained.extend(kept);
        }

        retained
    }
}

impl RetentionStrategy for PerPrefixRanking {
    fn name(&self) -> &'static str {
        "per-prefix"
    }

    fn classify(
        &self,
        images: &[&ImageRecord],
        config: &PolicyConfig,
        now: DateTime<Utc>,
    ) -> Vec<Reason> {
        let retained = Self::retained(images, config);

        images
            .iter()
            .map(|img| {
                if retained.contains(img.digest.as_str()) {
                    Reason::RetainedRecentMatch
                } else if img.is_untagged() {
                    Reason::Untagged
                } else if img
                    .age_days(now)
                    .is_some_and(|age| age > config.max_age_days)
                {
                    Reason::AgedOut
                } else {
                    Reason::RetainedWithinAge
                }
            })
            .collect()
    }
}
