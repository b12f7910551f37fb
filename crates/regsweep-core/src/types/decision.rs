//! Per-image retention decisions and per-repository plans

use super::ImageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Keep,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => write!(f, "KEEP"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Why an image was kept or deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Reason {
    /// Among the most recent images matching a retained prefix
    RetainedRecentMatch,
    /// Carries no tags
    Untagged,
    /// Ranked out of the retained set, or older than the age threshold
    AgedOut,
    /// Not retained by prefix, but younger than the age threshold
    RetainedWithinAge,
    /// Tagged but matching no retained prefix; the global variant leaves these alone
    NoPrefixMatch,
}

impl Reason {
    /// The action implied by this reason
    pub fn action(&self) -> Action {
        match self {
            Self::RetainedRecentMatch | Self::RetainedWithinAge | Self::NoPrefixMatch => {
                Action::Keep
            }
            Self::Untagged | Self::AgedOut => Action::Delete,
        }
    }

    /// Short human-readable explanation
    pub fn describe(&self) -> &'static str {
        match self {
            Self::RetainedRecentMatch => "latest tag-match",
            Self::Untagged => "untagged image",
            Self::AgedOut => "old image",
            Self::RetainedWithinAge => "within retention period",
            Self::NoPrefixMatch => "no retained prefix matched",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::RetainedRecentMatch => "RETAINED_RECENT_MATCH",
            Self::Untagged => "UNTAGGED",
            Self::AgedOut => "AGED_OUT",
            Self::RetainedWithinAge => "RETAINED_WITHIN_AGE",
            Self::NoPrefixMatch => "NO_PREFIX_MATCH",
        };
        f.write_str(code)
    }
}

/// Retention decision for one image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub digest: String,
    pub action: Action,
    pub reason: Reason,

    /// Tags of the image, sorted
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whole days since push at evaluation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
}

impl Decision {
    /// Build a decision for `image`; the action follows from `reason`
    pub fn new(image: &ImageRecord, reason: Reason, now: DateTime<Utc>) -> Self {
        Self {
            digest: image.digest.clone(),
            action: reason.action(),
            reason,
            tags: image.tags.iter().cloned().collect(),
            age_days: image.age_days(now),
        }
    }

    pub fn is_delete(&self) -> bool {
        self.action == Action::Delete
    }
}

/// Decisions for one repository, plus the digests skipped for missing metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryPlan {
    pub repository: String,
    pub decisions: Vec<Decision>,

    /// Digests excluded from evaluation because their push time is unknown
    #[serde(default)]
    pub skipped: Vec<String>,
}

impl RepositoryPlan {
    /// Decisions with a DELETE action
    pub fn to_delete(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| d.is_delete())
    }

    /// Decisions with a KEEP action
    pub fn kept(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter().filter(|d| !d.is_delete())
    }

    pub fn delete_count(&self) -> usize {
        self.to_delete().count()
    }

    pub fn keep_count(&self) -> usize {
        self.kept().count()
    }

    /// Number of decisions carrying `reason`
    pub fn count_reason(&self, reason: Reason) -> usize {
        self.decisions.iter().filter(|d| d.reason == reason).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reason_implies_action() {
        assert_eq!(Reason::RetainedRecentMatch.action(), Action::Keep);
        assert_eq!(Reason::RetainedWithinAge.action(), Action::Keep);
        assert_eq!(Reason::NoPrefixMatch.action(), Action::Keep);
        assert_eq!(Reason::Untagged.action(), Action::Delete);
        assert_eq!(Reason::AgedOut.action(), Action::Delete);
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(Reason::RetainedRecentMatch.to_string(), "RETAINED_RECENT_MATCH");
        assert_eq!(
            serde_json::to_string(&Reason::AgedOut).unwrap(),
            "\"AGED_OUT\""
        );
        assert_eq!(serde_json::to_string(&Action::Delete).unwrap(), "\"DELETE\"");
    }

    #[test]
    fn test_plan_counts() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let a = ImageRecord::new("sha256:a").with_tags(["latest"]).pushed_at(now);
        let b = ImageRecord::new("sha256:b").pushed_at(now);
        let plan = RepositoryPlan {
            repository: "app".to_string(),
            decisions: vec![
                Decision::new(&a, Reason::RetainedRecentMatch, now),
                Decision::new(&b, Reason::Untagged, now),
            ],
            skipped: vec!["sha256:c".to_string()],
        };

        assert_eq!(plan.keep_count(), 1);
        assert_eq!(plan.delete_count(), 1);
        assert_eq!(plan.count_reason(Reason::Untagged), 1);
        assert_eq!(plan.to_delete().next().unwrap().digest, "sha256:b");
        assert_eq!(plan.decisions[0].age_days, Some(0));
    }
}
