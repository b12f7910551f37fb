//! Image records as observed in a registry snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const SECONDS_PER_DAY: i64 = 86_400;

/// One image digest within a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Content digest (e.g., "sha256:abc123..."), unique within a repository
    pub digest: String,

    /// Tags pointing at this digest; empty for untagged images
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Push timestamp; absent only for incomplete registry responses
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// Create an untagged record with no push timestamp
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            tags: BTreeSet::new(),
            pushed_at: None,
        }
    }

    /// Add tags to the record
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the push timestamp
    pub fn pushed_at(mut self, pushed_at: DateTime<Utc>) -> Self {
        self.pushed_at = Some(pushed_at);
        self
    }

    /// Whether the image carries no tags at all
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether any tag starts with `prefix` (case-sensitive)
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.tags.iter().any(|tag| tag.starts_with(prefix))
    }

    /// Whole days elapsed between push and `now`, rounded down
    ///
    /// Returns `None` when the push timestamp is unknown.
    pub fn age_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.pushed_at
            .map(|pushed| (now - pushed).num_seconds().div_euclid(SECONDS_PER_DAY))
    }
}
