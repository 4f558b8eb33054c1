//! Rule-set identifiers and the opaque rule document.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RuleError;

/// Storage bucket (and local directory) holding the rule files.
pub const RULES_BUCKET: &str = "rules";

// ============================================================================
// RULE SET KIND
// ============================================================================

/// The three declarative rule sets the service knows about.
///
/// Each kind maps to a fixed cache key and a fixed YAML file name under
/// [`RULES_BUCKET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuleSetKind {
    /// Prospect/donor routing to development officers.
    #[serde(rename = "routing_rules")]
    Routing,
    /// Detection of overlapping officer assignments.
    #[serde(rename = "collision_rules")]
    Collision,
    /// Gift/proposal amounts that require sign-off.
    #[serde(rename = "approval_thresholds")]
    ApprovalThresholds,
}

impl RuleSetKind {
    /// Every known rule set, in a stable order.
    pub const ALL: [RuleSetKind; 3] = [
        RuleSetKind::Routing,
        RuleSetKind::Collision,
        RuleSetKind::ApprovalThresholds,
    ];

    /// Logical cache key for this rule set.
    pub fn cache_key(&self) -> &'static str {
        match self {
            RuleSetKind::Routing => "routing_rules",
            RuleSetKind::Collision => "collision_rules",
            RuleSetKind::ApprovalThresholds => "approval_thresholds",
        }
    }

    /// File name of the YAML source, relative to the rules bucket.
    pub fn file_name(&self) -> &'static str {
        match self {
            RuleSetKind::Routing => "routing_rules.yaml",
            RuleSetKind::Collision => "collision_rules.yaml",
            RuleSetKind::ApprovalThresholds => "approval_thresholds.yaml",
        }
    }
}

impl fmt::Display for RuleSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

impl FromStr for RuleSetKind {
    type Err = RuleError;

    /// Accepts the cache key, with or without a `.yaml` suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let key = normalized.strip_suffix(".yaml").unwrap_or(&normalized);
        RuleSetKind::ALL
            .into_iter()
            .find(|kind| kind.cache_key() == key)
            .ok_or_else(|| RuleError::UnknownRuleSet {
                name: s.to_string(),
            })
    }
}

// ============================================================================
// RULE DOCUMENT
// ============================================================================

/// A parsed rule file.
///
/// The cache treats this as opaque: it is a string-keyed mapping of arbitrary
/// values and is passed through unchanged. Use [`crate::RuleSet`] when the
/// structure matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleDocument(Map<String, Value>);

impl RuleDocument {
    /// Wrap an already-parsed mapping.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse YAML text. A document whose root is not a mapping is rejected
    /// by the parser.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text).map(Self)
    }

    /// Parse raw YAML bytes as downloaded from storage.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes).map(Self)
    }

    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrow the underlying mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RuleDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
