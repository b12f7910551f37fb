//! Global top-N ranking across all prefix matches

use super::{most_recent, RetentionStrategy};
use crate::types::{ImageRecord, PolicyConfig, Reason};
use chrono::{DateTime, Utc};

/// Keeps the newest `keep_per_prefix` images among all prefix matches combined
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalRanking;

impl RetentionStrategy for GlobalRanking {
    fn name(&self) -> &'static str {
        "global"
    }

    fn classify(
        &self,
        images: &[&ImageRecord],
        config: &PolicyConfig,
        _now: DateTime<Utc>,
    ) -> Vec<Reason> {
        let is_match = |img: &ImageRecord| {
            !img.is_untagged()
                && config
                    .retained_prefixes
                    .iter()
                    .any(|prefix| img.matches_prefix(prefix))
        };

        let matched: Vec<&ImageRecord> =
            images.iter().copied().filter(|&img| is_match(img)).collect();
        let retained = most_recent(matched, config.keep_per_prefix);

        images
            .iter()
            .map(|img| {
                if img.is_untagged() {
                    Reason::Untagged
                } else if retained.contains(img.digest.as_str()) {
                    Reason::RetainedRecentMatch
                } else if is_match(*img) {
                    Reason::AgedOut
                } else {
                    Reason::NoPrefixMatch
                }
            })
            .collect()
    }
}
