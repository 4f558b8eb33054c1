//! CSOS Test Utilities
//!
//! Shared test infrastructure for the CSOS workspace:
//! - In-memory rule sources with call counting and failure injection
//! - Rule YAML fixtures and role assignment fixtures
//! - Proptest generators for rules and facts
//! - A one-call builder for a rule cache over fake sources

pub use csos_core::{
    RoleAssignment, Rule, RuleDocument, RuleSet, RuleSetKind, UserId, RULES_BUCKET,
};
pub use csos_storage::{
    LoadError, ManualClock, RemoteError, RuleCache, RuleCacheConfig, RuleLoader,
};

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use csos_storage::{LocalFiles, RemoteStorage};

// ============================================================================
// FAKE RULE SOURCES
// ============================================================================

/// In-memory remote storage.
///
/// Objects are keyed by `(bucket, path)`. Unknown objects answer
/// [`RemoteError::NotFound`]; injected failures take precedence over stored
/// objects.
#[derive(Debug, Default)]
pub struct FakeRemoteStorage {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failures: Mutex<HashMap<(String, String), RemoteError>>,
    fail_all: Mutex<Option<RemoteError>>,
    downloads: AtomicUsize,
}

impl FakeRemoteStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding all three rule fixtures in the rules bucket.
    pub fn with_fixtures() -> Self {
        let storage = Self::new();
        for kind in RuleSetKind::ALL {
            storage.put(RULES_BUCKET, kind.file_name(), fixture_yaml(kind));
        }
        storage
    }

    pub fn put(&self, bucket: &str, path: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((bucket.to_string(), path.to_string()), body.into());
    }

    /// Make one object fail with `error` until [`Self::recover`] is called.
    pub fn fail(&self, bucket: &str, path: &str, error: RemoteError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((bucket.to_string(), path.to_string()), error);
    }

    /// Make every download fail as if the network were down.
    pub fn go_offline(&self) {
        *self.fail_all.lock().unwrap_or_else(|e| e.into_inner()) = Some(RemoteError::Network {
            bucket: String::new(),
            path: String::new(),
            message: "connection refused".to_string(),
        });
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        self.failures.lock().unwrap_or_else(|e| e.into_inner()).clear();
        *self.fail_all.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Number of download calls seen so far.
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStorage for FakeRemoteStorage {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.fail_all.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(err);
        }

        let key = (bucket.to_string(), path.to_string());
        if let Some(err) = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Err(err.clone());
        }

        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
            .ok_or(RemoteError::NotFound {
                bucket: key.0,
                path: key.1,
            })
    }
}

/// In-memory local files keyed by relative path.
#[derive(Debug, Default)]
pub struct FakeLocalFiles {
    files: Mutex<HashMap<PathBuf, String>>,
    reads: AtomicUsize,
}

impl FakeLocalFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local copies of all three rule fixtures under `rules/`.
    pub fn with_fixtures() -> Self {
        let files = Self::new();
        for kind in RuleSetKind::ALL {
            files.put(
                Path::new(RULES_BUCKET).join(kind.file_name()),
                fixture_yaml(kind),
            );
        }
        files
    }

    pub fn put(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), text.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path.as_ref());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalFiles for FakeLocalFiles {
    async fn read_text_file(&self, relative: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(relative)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", relative.display()),
                )
            })
    }
}

/// Fakes and a manual clock wired into a rule cache.
pub struct CacheHarness {
    pub remote: Arc<FakeRemoteStorage>,
    pub local: Arc<FakeLocalFiles>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<RuleCache>,
}

impl CacheHarness {
    pub fn new(remote: FakeRemoteStorage, local: FakeLocalFiles, config: RuleCacheConfig) -> Self {
        let remote = Arc::new(remote);
        let local = Arc::new(local);
        let clock = Arc::new(ManualClock::default());
        let loader = RuleLoader::new(remote.clone(), local.clone());
        let cache = Arc::new(RuleCache::new(loader, clock.clone(), config));
        Self {
            remote,
            local,
            clock,
            cache,
        }
    }

    /// Remote and local both seeded with fixtures, default config.
    pub fn with_fixtures() -> Self {
        Self::new(
            FakeRemoteStorage::with_fixtures(),
            FakeLocalFiles::with_fixtures(),
            RuleCacheConfig::default(),
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub const ROUTING_RULES_YAML: &str = r#"
version: 3
rules:
  - name: major-gift-football
    priority: 100
    match:
      sport: football
      capacity: { gte: 25000 }
    action:
      assign_to: major_gifts
  - name: premium-seating
    priority: 50
    match:
      interest: [suites, club_seats]
    action:
      assign_to: premium_seating
  - name: default-annual-fund
    priority: 0
    action:
      assign_to: annual_fund
"#;

pub const COLLISION_RULES_YAML: &str = r#"
version: 1
rules:
  - name: same-prospect-two-officers
    priority: 10
    match:
      open_assignments: { gt: 1 }
    action:
      resolve: keep_oldest
  - name: officer-on-leave
    priority: 20
    match:
      officer.status: on_leave
    action:
      resolve: reassign
"#;

pub const APPROVAL_THRESHOLDS_YAML: &str = r#"
version: 2
rules:
  - name: executive-approval
    priority: 100
    match:
      amount: { gte: 100000 }
    action:
      approver: athletic_director
  - name: manager-approval
    priority: 50
    match:
      amount: { gte: 10000, lt: 100000 }
    action:
      approver: development_manager
  - name: retired-threshold
    priority: 200
    enabled: false
    match:
      amount: { gte: 0 }
    action:
      approver: nobody
"#;

/// Fixture text for a rule-set kind.
pub fn fixture_yaml(kind: RuleSetKind) -> &'static str {
    match kind {
        RuleSetKind::Routing => ROUTING_RULES_YAML,
        RuleSetKind::Collision => COLLISION_RULES_YAML,
        RuleSetKind::ApprovalThresholds => APPROVAL_THRESHOLDS_YAML,
    }
}

/// Deterministic user id for fixtures.
pub fn user(n: u128) -> UserId {
    UserId::from_u128(n)
}

/// A small role table: user 1 is an admin, users 2 and 3 are officers, user
/// 3 also has a viewer role, user 4 is a super admin.
pub fn role_fixture() -> Vec<RoleAssignment> {
    [
        (1, "admin"),
        (2, "development_officer"),
        (3, "development_officer"),
        (3, "viewer"),
        (4, "super_admin"),
    ]
    .into_iter()
    .map(|(n, role)| RoleAssignment {
        user_id: user(n),
        role: role.to_string(),
    })
    .collect()
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::{Rule, RuleSetKind};

    pub fn arb_rule_set_kind() -> impl Strategy<Value = RuleSetKind> {
        prop::sample::select(RuleSetKind::ALL.to_vec())
    }

    /// Rules with an empty `match` block so every one of them matches.
    pub fn arb_catch_all_rule() -> impl Strategy<Value = Rule> {
        ("[a-z]{1,12}", -1000i64..1000, any::<bool>()).prop_map(|(name, priority, enabled)| {
            Rule {
                name,
                priority,
                conditions: Default::default(),
                action: json!({ "priority": priority }),
                enabled,
            }
        })
    }

    /// Flat fact objects with a numeric `amount` and a string `sport`.
    pub fn arb_facts() -> impl Strategy<Value = Value> {
        (0u32..200_000, "[a-z]{3,10}")
            .prop_map(|(amount, sport)| json!({ "amount": amount, "sport": sport }))
    }
}
