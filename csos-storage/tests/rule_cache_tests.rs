//! Rule cache behaviour over fake sources and a manual clock.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use csos_storage::{LoadError, RemoteError, RuleCacheConfig, RuleCacheError};
use csos_test_utils::{
    generators, CacheHarness, FakeLocalFiles, FakeRemoteStorage, Rule, RuleSetKind,
    ROUTING_RULES_YAML, RULES_BUCKET,
};
use proptest::prelude::*;
use serde_json::json;

fn routing_path() -> std::path::PathBuf {
    Path::new(RULES_BUCKET).join(RuleSetKind::Routing.file_name())
}

#[tokio::test]
async fn test_fresh_entry_served_without_reload() {
    let h = CacheHarness::with_fixtures();

    let first = h.cache.get(RuleSetKind::Routing).await.expect("first load");
    h.clock.advance(Duration::from_secs(60));
    let second = h.cache.get(RuleSetKind::Routing).await.expect("cached read");

    assert_eq!(h.remote.downloads(), 1);
    assert_eq!(first, second);

    let counters = h.cache.counters();
    assert_eq!(counters.hits, 1);
    assert_eq!(counters.misses, 1);
    assert_eq!(counters.remote_loads, 1);
}

#[tokio::test]
async fn test_stale_entry_is_reloaded() {
    let h = CacheHarness::with_fixtures();

    h.cache.get(RuleSetKind::Routing).await.expect("first load");
    h.remote.put(
        RULES_BUCKET,
        RuleSetKind::Routing.file_name(),
        "version: 4\nrules: []\n",
    );

    // Exactly at the TTL the entry is no longer fresh.
    h.clock.advance(Duration::from_secs(300));
    let doc = h.cache.get(RuleSetKind::Routing).await.expect("reload");

    assert_eq!(h.remote.downloads(), 2);
    assert_eq!(doc.get("version"), Some(&json!(4)));
}

#[tokio::test]
async fn test_custom_ttl_is_honoured() {
    let h = CacheHarness::new(
        FakeRemoteStorage::with_fixtures(),
        FakeLocalFiles::new(),
        RuleCacheConfig::new().with_ttl(Duration::from_secs(10)),
    );

    h.cache.get(RuleSetKind::Collision).await.expect("load");
    h.clock.advance(Duration::from_secs(9));
    h.cache.get(RuleSetKind::Collision).await.expect("hit");
    assert_eq!(h.remote.downloads(), 1);

    h.clock.advance(Duration::from_secs(1));
    h.cache.get(RuleSetKind::Collision).await.expect("reload");
    assert_eq!(h.remote.downloads(), 2);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::with_fixtures(),
        RuleCacheConfig::default(),
    );
    h.remote.go_offline();

    let doc = h
        .cache
        .get(RuleSetKind::ApprovalThresholds)
        .await
        .expect("local fallback");

    assert_eq!(doc.get("version"), Some(&json!(2)));
    assert_eq!(h.local.reads(), 1);
    assert_eq!(h.cache.counters().fallback_loads, 1);
    assert_eq!(h.cache.counters().remote_loads, 0);
}

#[tokio::test]
async fn test_remote_success_skips_local() {
    let h = CacheHarness::with_fixtures();
    h.cache.get(RuleSetKind::Routing).await.expect("load");
    assert_eq!(h.local.reads(), 0);
}

#[tokio::test]
async fn test_all_sources_failed_reports_both() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::new(),
        RuleCacheConfig::default(),
    );
    h.remote.fail(
        RULES_BUCKET,
        RuleSetKind::Routing.file_name(),
        RemoteError::PermissionDenied {
            bucket: RULES_BUCKET.into(),
            path: RuleSetKind::Routing.file_name().into(),
        },
    );

    let err = h
        .cache
        .get(RuleSetKind::Routing)
        .await
        .expect_err("both sources missing");

    match &err {
        LoadError::AllSourcesFailed {
            remote,
            local,
            local_path,
            ..
        } => {
            assert!(matches!(remote, RemoteError::PermissionDenied { .. }));
            assert_eq!(local.kind(), std::io::ErrorKind::NotFound);
            assert_eq!(Path::new(local_path), routing_path());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("routing_rules.yaml"));
    assert!(h.cache.stats().is_empty());
    assert_eq!(h.cache.counters().failures, 1);
}

#[tokio::test]
async fn test_failed_reload_keeps_previous_entry() {
    let h = CacheHarness::new(
        FakeRemoteStorage::with_fixtures(),
        FakeLocalFiles::new(),
        RuleCacheConfig::default(),
    );
    h.cache.get(RuleSetKind::Routing).await.expect("first load");

    h.clock.advance(Duration::from_secs(301));
    h.remote.go_offline();
    assert!(h.cache.get(RuleSetKind::Routing).await.is_err());

    let stats = h.cache.stats();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].key, "routing_rules");
    assert_eq!(stats[0].age_ms, 301_000);

    // Once the remote is back the stale entry is replaced.
    h.remote.recover();
    h.cache.get(RuleSetKind::Routing).await.expect("recovered");
    assert_eq!(h.cache.stats()[0].age_ms, 0);
}

#[tokio::test]
async fn test_parse_error_does_not_fall_back() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::with_fixtures(),
        RuleCacheConfig::default(),
    );
    h.remote.put(
        RULES_BUCKET,
        RuleSetKind::Routing.file_name(),
        "rules: [unclosed",
    );

    let err = h
        .cache
        .get(RuleSetKind::Routing)
        .await
        .expect_err("malformed yaml");
    assert!(matches!(err, LoadError::Parse(_)));
    assert_eq!(h.local.reads(), 0);
}

#[tokio::test]
async fn test_local_parse_error_propagates() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::new(),
        RuleCacheConfig::default(),
    );
    h.local.put(routing_path(), "- just\n- a list\n");

    let err = h
        .cache
        .get(RuleSetKind::Routing)
        .await
        .expect_err("sequence root is not a document");
    assert!(matches!(err, LoadError::Parse(_)));
}

#[tokio::test]
async fn test_clear_forces_reload() {
    let h = CacheHarness::with_fixtures();
    h.cache.get(RuleSetKind::Routing).await.expect("load");
    h.cache.get(RuleSetKind::Collision).await.expect("load");
    assert_eq!(h.cache.stats().len(), 2);

    h.cache.clear();
    assert!(h.cache.stats().is_empty());

    h.cache.get(RuleSetKind::Routing).await.expect("reload");
    assert_eq!(h.remote.downloads(), 3);
}

#[tokio::test]
async fn test_stats_report_ages_by_key() {
    let h = CacheHarness::with_fixtures();
    h.cache.get(RuleSetKind::Routing).await.expect("load");
    h.clock.advance(Duration::from_millis(1_500));
    h.cache
        .get(RuleSetKind::ApprovalThresholds)
        .await
        .expect("load");
    h.clock.advance(Duration::from_millis(500));

    let stats = h.cache.stats();
    let keys: Vec<_> = stats.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["approval_thresholds", "routing_rules"]);
    assert_eq!(stats[0].age_ms, 500);
    assert_eq!(stats[1].age_ms, 2_000);
}

#[tokio::test]
async fn test_load_bypasses_cache() {
    let h = CacheHarness::with_fixtures();
    h.remote.put("imports", "2024/fall.yaml", "rows: 12\n");

    let doc = h
        .cache
        .load("imports", "2024/fall.yaml")
        .await
        .expect("direct load");
    assert_eq!(doc.get("rows"), Some(&json!(12)));
    assert!(h.cache.stats().is_empty());
    assert_eq!(h.cache.counters().misses, 0);
}

#[tokio::test]
async fn test_rule_set_evaluates_by_priority() {
    let h = CacheHarness::with_fixtures();
    let routing = h
        .cache
        .rule_set(RuleSetKind::Routing)
        .await
        .expect("valid routing rules");

    let facts = json!({ "sport": "football", "capacity": 60000, "interest": "suites" });
    let first = routing.evaluate(&facts).expect("a rule matches");
    assert_eq!(first.name, "major-gift-football");

    let names: Vec<_> = routing
        .evaluate_all(&facts)
        .into_iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["major-gift-football", "premium-seating", "default-annual-fund"]
    );
}

#[tokio::test]
async fn test_disabled_threshold_is_skipped() {
    let h = CacheHarness::with_fixtures();
    let thresholds = h
        .cache
        .rule_set(RuleSetKind::ApprovalThresholds)
        .await
        .expect("valid thresholds");

    let rule = thresholds
        .evaluate(&json!({ "amount": 25000 }))
        .expect("manager threshold");
    assert_eq!(rule.name, "manager-approval");
    assert!(thresholds.evaluate(&json!({ "amount": 500 })).is_none());
}

#[tokio::test]
async fn test_rule_set_rejects_invalid_document() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::new(),
        RuleCacheConfig::default(),
    );
    h.remote.put(
        RULES_BUCKET,
        RuleSetKind::Collision.file_name(),
        "version: 1\n",
    );

    let err = h
        .cache
        .rule_set(RuleSetKind::Collision)
        .await
        .expect_err("no rules list");
    assert!(matches!(err, RuleCacheError::Rule(_)));
    // The raw document is still cached.
    assert_eq!(h.cache.stats().len(), 1);
}

#[tokio::test]
async fn test_preload_counts_successes() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::new(),
        RuleCacheConfig::default(),
    );
    h.remote.put(
        RULES_BUCKET,
        RuleSetKind::Routing.file_name(),
        ROUTING_RULES_YAML,
    );

    assert_eq!(h.cache.preload().await, 1);
    assert_eq!(h.cache.counters().failures, 2);
}

#[tokio::test]
async fn test_custom_bucket_is_used() {
    let remote = FakeRemoteStorage::new();
    remote.put("staging", "routing_rules.yaml", ROUTING_RULES_YAML);
    let h = CacheHarness::new(
        remote,
        FakeLocalFiles::new(),
        RuleCacheConfig::new().with_bucket("staging"),
    );

    h.cache
        .get(RuleSetKind::Routing)
        .await
        .expect("served from the staging bucket");
}

#[tokio::test]
async fn test_removed_local_copy_fails_after_clear() {
    let h = CacheHarness::new(
        FakeRemoteStorage::new(),
        FakeLocalFiles::with_fixtures(),
        RuleCacheConfig::default(),
    );
    h.remote.go_offline();
    h.cache.get(RuleSetKind::Routing).await.expect("local fallback");

    h.local.remove(routing_path());
    h.cache.clear();

    let err = h
        .cache
        .get(RuleSetKind::Routing)
        .await
        .expect_err("no source left");
    assert!(matches!(err, LoadError::AllSourcesFailed { .. }));
    assert_eq!(h.local.reads(), 2);
}

fn arb_unique_rules() -> impl Strategy<Value = Vec<Rule>> {
    prop::collection::vec(generators::arb_catch_all_rule(), 0..16).prop_map(|rules| {
        let mut seen = HashSet::new();
        rules
            .into_iter()
            .filter(|rule| seen.insert(rule.name.clone()))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_cached_rule_set_orders_matches_by_priority(
        kind in generators::arb_rule_set_kind(),
        rules in arb_unique_rules(),
        facts in generators::arb_facts(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        rt.block_on(async {
            let remote = FakeRemoteStorage::new();
            // JSON is valid YAML.
            remote.put(
                RULES_BUCKET,
                kind.file_name(),
                json!({ "version": 1, "rules": rules }).to_string(),
            );
            let h = CacheHarness::new(remote, FakeLocalFiles::new(), RuleCacheConfig::default());

            let set = h.cache.rule_set(kind).await.expect("generated rules are valid");
            let matches = set.evaluate_all(&facts);

            for pair in matches.windows(2) {
                prop_assert!(pair[0].priority >= pair[1].priority);
            }
            prop_assert_eq!(matches.len(), rules.iter().filter(|r| r.enabled).count());
            prop_assert_eq!(set.evaluate(&facts), matches.first().copied());
            Ok(())
        })?;
    }

    #[test]
    fn prop_entry_fresh_strictly_before_ttl(ttl_ms in 1u64..600_000, elapsed_frac in 0.0f64..1.0) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        rt.block_on(async {
            let ttl = Duration::from_millis(ttl_ms);
            let h = CacheHarness::new(
                FakeRemoteStorage::with_fixtures(),
                FakeLocalFiles::new(),
                RuleCacheConfig::new().with_ttl(ttl),
            );
            h.cache.get(RuleSetKind::Routing).await.expect("load");

            let elapsed = ((ttl_ms as f64) * elapsed_frac) as u64;
            h.clock.advance(Duration::from_millis(elapsed));
            h.cache.get(RuleSetKind::Routing).await.expect("hit");
            prop_assert_eq!(h.remote.downloads(), 1);
            prop_assert_eq!(h.cache.stats()[0].age_ms, elapsed);

            h.clock.advance(Duration::from_millis(ttl_ms - elapsed));
            h.cache.get(RuleSetKind::Routing).await.expect("reload");
            prop_assert_eq!(h.remote.downloads(), 2);
            Ok(())
        })?;
    }
}
