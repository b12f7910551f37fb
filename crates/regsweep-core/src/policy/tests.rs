//! Scenario and property tests for the retention engine

use super::*;
use crate::types::Action;
use chrono::{Duration, TimeZone};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn image(digest: &str, tags: &[&str], days_ago: i64) -> ImageRecord {
    ImageRecord::new(digest)
        .with_tags(tags.iter().copied())
        .pushed_at(now() - Duration::days(days_ago))
}

fn policy(variant: PolicyVariant, prefixes: &[&str], keep: u32, max_age_days: i64) -> PolicyConfig {
    PolicyConfig {
        variant,
        retained_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        keep_per_prefix: keep,
        max_age_days,
        dry_run: true,
    }
}

fn reason_of(decisions: &[Decision], digest: &str) -> Reason {
    decisions
        .iter()
        .find(|d| d.digest == digest)
        .unwrap_or_else(|| panic!("no decision for {}", digest))
        .reason
}

/// A mixed repository used by the property checks
fn mixed_repository() -> Vec<ImageRecord> {
    vec![
        image("sha256:01", &["latest"], 0),
        image("sha256:02", &["latest-rc"], 3),
        image("sha256:03", &["dev-17", "main-4"], 5),
        image("sha256:04", &["dev-16"], 5),
        image("sha256:05", &["feature-x"], 2),
        image("sha256:06", &["feature-y"], 30),
        image("sha256:07", &[], 1),
        image("sha256:08", &[], 90),
        image("sha256:09", &["main-3"], 45),
        ImageRecord::new("sha256:10").with_tags(["latest-old"]),
        image("sha256:11", &["main-2"], 60),
    ]
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_global_ranking_drops_third_match() {
    let images = vec![
        image("sha256:latest-new", &["latest"], 0),
        image("sha256:latest-old", &["latest"], 1),
        image("sha256:dev", &["dev"], 2),
    ];
    let config = policy(PolicyVariant::Global, &["latest", "dev"], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();

    assert_eq!(decisions.len(), 3);
    assert_eq!(reason_of(&decisions, "sha256:latest-new"), Reason::RetainedRecentMatch);
    assert_eq!(reason_of(&decisions, "sha256:latest-old"), Reason::RetainedRecentMatch);
    assert_eq!(reason_of(&decisions, "sha256:dev"), Reason::AgedOut);
}

#[test]
fn test_scenario_per_prefix_keeps_each_group() {
    let images = vec![
        image("sha256:latest-new", &["latest"], 0),
        image("sha256:latest-old", &["latest"], 1),
        image("sha256:dev", &["dev"], 2),
    ];
    let config = policy(PolicyVariant::PerPrefix, &["latest", "dev"], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();

    assert!(decisions
        .iter()
        .all(|d| d.reason == Reason::RetainedRecentMatch && d.action == Action::Keep));
}

#[test]
fn test_scenario_untagged_always_deleted() {
    let images = vec![image("sha256:bare", &[], 0)];

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        for max_age in [0, 10, 1000] {
            let config = policy(variant, &["latest"], 2, max_age);
            let decisions = evaluate(&images, &config, now()).unwrap();
            assert_eq!(decisions.len(), 1);
            assert_eq!(decisions[0].action, Action::Delete);
            assert_eq!(decisions[0].reason, Reason::Untagged);
        }
    }
}

#[test]
fn test_scenario_unmatched_old_image_aged_out() {
    let images = vec![image("sha256:old", &["feature-x"], 40)];
    let config = policy(PolicyVariant::PerPrefix, &["latest", "dev"], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();

    assert_eq!(decisions[0].action, Action::Delete);
    assert_eq!(decisions[0].reason, Reason::AgedOut);
    assert_eq!(decisions[0].age_days, Some(40));
}

#[test]
fn test_scenario_zero_keep_is_configuration_error() {
    let config = policy(PolicyVariant::Global, &["latest"], 0, 10);
    let err = evaluate(&mixed_repository(), &config, now()).unwrap_err();
    assert!(err.is_configuration());

    let config = policy(PolicyVariant::PerPrefix, &["latest"], 0, 10);
    assert!(evaluate(&mixed_repository(), &config, now()).is_err());
}

#[test]
fn test_scenario_missing_timestamp_excluded() {
    let images = vec![
        ImageRecord::new("sha256:unknown").with_tags(["latest"]),
        ImageRecord::new("sha256:unknown-bare"),
        image("sha256:known", &["latest"], 1),
    ];

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        let config = policy(variant, &["latest"], 2, 10);
        let decisions = evaluate(&images, &config, now()).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].digest, "sha256:known");
    }
}

// ============================================================================
// Global variant
// ============================================================================

#[test]
fn test_global_ignores_age_for_top_matches() {
    let images = vec![image("sha256:ancient", &["latest"], 400)];
    let config = policy(PolicyVariant::Global, &["latest"], 1, 0);

    let decisions = evaluate(&images, &config, now()).unwrap();
    assert_eq!(decisions[0].reason, Reason::RetainedRecentMatch);
}

#[test]
fn test_global_leaves_unmatched_images() {
    let images = vec![
        image("sha256:feature", &["feature-x"], 400),
        image("sha256:latest", &["latest"], 0),
    ];
    let config = policy(PolicyVariant::Global, &["latest"], 1, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();
    assert_eq!(reason_of(&decisions, "sha256:feature"), Reason::NoPrefixMatch);
    assert_eq!(decisions[0].action, Action::Keep);
}

#[test]
fn test_global_requires_prefixes() {
    let config = policy(PolicyVariant::Global, &[], 2, 10);
    assert!(evaluate(&[], &config, now()).unwrap_err().is_configuration());
}

// ============================================================================
// Per-prefix variant
// ============================================================================

#[test]
fn test_per_prefix_union_across_groups() {
    let images = vec![
        image("sha256:both", &["dev-9", "release-9"], 1),
        image("sha256:dev-old", &["dev-8"], 20),
        image("sha256:release-old", &["release-8"], 3),
    ];
    let config = policy(PolicyVariant::PerPrefix, &["dev", "release"], 1, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();

    assert_eq!(reason_of(&decisions, "sha256:both"), Reason::RetainedRecentMatch);
    assert_eq!(reason_of(&decisions, "sha256:dev-old"), Reason::AgedOut);
    assert_eq!(reason_of(&decisions, "sha256:release-old"), Reason::RetainedWithinAge);
}

#[test]
fn test_per_prefix_retained_survives_age_cutoff() {
    let images = vec![
        image("sha256:main-new", &["main-2"], 50),
        image("sha256:main-old", &["main-1"], 60),
        image("sha256:main-oldest", &["main-0"], 70),
    ];
    let config = policy(PolicyVariant::PerPrefix, &["main"], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();

    assert_eq!(reason_of(&decisions, "sha256:main-new"), Reason::RetainedRecentMatch);
    assert_eq!(reason_of(&decisions, "sha256:main-old"), Reason::RetainedRecentMatch);
    assert_eq!(reason_of(&decisions, "sha256:main-oldest"), Reason::AgedOut);
}

#[test]
fn test_per_prefix_age_boundary_is_inclusive() {
    let images = vec![
        image("sha256:edge", &["feature"], 10),
        image("sha256:past", &["feature"], 11),
    ];
    let config = policy(PolicyVariant::PerPrefix, &["latest"], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();
    assert_eq!(reason_of(&decisions, "sha256:edge"), Reason::RetainedWithinAge);
    assert_eq!(reason_of(&decisions, "sha256:past"), Reason::AgedOut);
}

#[test]
fn test_per_prefix_without_prefixes_is_age_only() {
    let images = vec![
        image("sha256:young", &["latest"], 1),
        image("sha256:old", &["latest"], 30),
    ];
    let config = policy(PolicyVariant::PerPrefix, &[], 2, 10);

    let decisions = evaluate(&images, &config, now()).unwrap();
    assert_eq!(reason_of(&decisions, "sha256:young"), Reason::RetainedWithinAge);
    assert_eq!(reason_of(&decisions, "sha256:old"), Reason::AgedOut);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_empty_input_yields_no_decisions() {
    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        let config = policy(variant, &["latest"], 2, 10);
        assert!(evaluate(&[], &config, now()).unwrap().is_empty());
    }
}

#[test]
fn test_every_timestamped_digest_decided_once() {
    let images = mixed_repository();

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        for keep in 1..=4 {
            let config = policy(variant, &["latest", "dev", "main"], keep, 10);
            let decisions = evaluate(&images, &config, now()).unwrap();

            let mut expected: Vec<&str> = images
                .iter()
                .filter(|img| img.pushed_at.is_some())
                .map(|img| img.digest.as_str())
                .collect();
            let mut actual: Vec<&str> = decisions.iter().map(|d| d.digest.as_str()).collect();
            expected.sort();
            actual.sort();
            assert_eq!(actual, expected, "variant {} keep {}", variant, keep);
        }
    }
}

#[test]
fn test_global_retention_bound() {
    let images = mixed_repository();

    for keep in 1..=12 {
        let config = policy(PolicyVariant::Global, &["latest", "dev", "main"], keep, 10);
        let decisions = evaluate(&images, &config, now()).unwrap();
        let retained = decisions
            .iter()
            .filter(|d| d.reason == Reason::RetainedRecentMatch)
            .count();
        assert!(retained <= keep as usize);
    }
}

#[test]
fn test_untagged_never_kept() {
    let images = mixed_repository();

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        let config = policy(variant, &["latest", "dev", "main"], 5, 1000);
        let decisions = evaluate(&images, &config, now()).unwrap();
        for decision in decisions.iter().filter(|d| d.tags.is_empty()) {
            assert_eq!(decision.action, Action::Delete);
            assert_eq!(decision.reason, Reason::Untagged);
        }
    }
}

#[test]
fn test_evaluation_is_deterministic() {
    let images = mixed_repository();
    let mut reversed = images.clone();
    reversed.reverse();

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        let config = policy(variant, &["latest", "dev", "main"], 1, 10);
        let first = evaluate(&images, &config, now()).unwrap();
        let second = evaluate(&images, &config, now()).unwrap();
        assert_eq!(first, second);

        // Input order changes output order but not the outcome per digest
        let from_reversed = evaluate(&reversed, &config, now()).unwrap();
        for decision in &first {
            assert_eq!(reason_of(&from_reversed, &decision.digest), decision.reason);
        }
    }
}

#[test]
fn test_tie_break_prefers_smaller_digest() {
    let pushed = now() - Duration::days(3);
    let images = vec![
        ImageRecord::new("sha256:bbb").with_tags(["dev-2"]).pushed_at(pushed),
        ImageRecord::new("sha256:aaa").with_tags(["dev-1"]).pushed_at(pushed),
    ];

    for variant in [PolicyVariant::Global, PolicyVariant::PerPrefix] {
        let config = policy(variant, &["dev"], 1, 0);
        let decisions = evaluate(&images, &config, now()).unwrap();
        assert_eq!(reason_of(&decisions, "sha256:aaa"), Reason::RetainedRecentMatch);
        assert_eq!(reason_of(&decisions, "sha256:bbb"), Reason::AgedOut);
    }
}

#[test]
fn test_duplicate_digest_decided_once() {
    let images = vec![
        image("sha256:dup", &["latest"], 1),
        image("sha256:dup", &["latest"], 1),
    ];
    let config = policy(PolicyVariant::PerPrefix, &["latest"], 2, 10);
    assert_eq!(evaluate(&images, &config, now()).unwrap().len(), 1);
}

#[test]
fn test_dry_run_does_not_change_decisions() {
    let images = mixed_repository();
    let mut config = policy(PolicyVariant::PerPrefix, &["latest", "dev"], 1, 10);
    let dry = evaluate(&images, &config, now()).unwrap();
    config.dry_run = false;
    let live = evaluate(&images, &config, now()).unwrap();
    assert_eq!(dry, live);
}

#[test]
fn test_plan_repository_lists_skipped() {
    let config = policy(PolicyVariant::PerPrefix, &["latest", "dev", "main"], 2, 10);
    let plan = plan_repository("web", &mixed_repository(), &config, now()).unwrap();

    assert_eq!(plan.repository, "web");
    assert_eq!(plan.skipped, vec!["sha256:10".to_string()]);
    assert_eq!(plan.decisions.len(), 10);
    assert_eq!(plan.keep_count() + plan.delete_count(), 10);
}

#[test]
fn test_plan_repository_skips_only_undecided_digests() {
    let config = policy(PolicyVariant::PerPrefix, &["latest"], 2, 10);
    let images = vec![
        ImageRecord::new("sha256:aa").with_tags(["latest"]),
        image("sha256:aa", &["latest"], 1),
        ImageRecord::new("sha256:bb"),
        ImageRecord::new("sha256:bb"),
    ];

    let plan = plan_repository("web", &images, &config, now()).unwrap();

    assert_eq!(plan.decisions.len(), 1);
    assert_eq!(plan.decisions[0].digest, "sha256:aa");
    assert_eq!(plan.skipped, vec!["sha256:bb".to_string()]);
}

#[test]
fn test_strategy_names() {
    assert_eq!(strategy_for(PolicyVariant::Global).name(), "global");
    assert_eq!(strategy_for(PolicyVariant::PerPrefix).name(), "per-prefix");
}
