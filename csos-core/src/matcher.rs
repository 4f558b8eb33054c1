//! Typed rule sets and predicate matching.
//!
//! Rule documents share one shape across routing, collision and approval
//! sets:
//!
//! ```yaml
//! rules:
//!   - name: major-gift-prospects
//!     priority: 100
//!     match:
//!       sport: [football, basketball]
//!       capacity: { gte: 25000 }
//!       donor.tier: gold
//!     action:
//!       assign_to: major_gifts
//! ```
//!
//! A fact object is matched against each rule's `match` block. Field names
//! may use dots to reach into nested objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RuleError;
use crate::rules::{RuleDocument, RuleSetKind};

// ============================================================================
// CONDITIONS
// ============================================================================

/// A single field predicate.
///
/// The YAML form decides the variant: a sequence is a membership test, a
/// mapping of known operators is an operator set, anything else is an
/// equality test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    OneOf(Vec<Value>),
    Operators(Operators),
    Equals(Value),
}

/// Operator form of a condition. Every present operator must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operators {
    /// `eq: null` is kept as `Some(Null)` and means "fact is missing".
    #[serde(default, deserialize_with = "explicit_value", skip_serializing_if = "Option::is_none")]
    pub eq: Option<Value>,
    /// `ne: null` is kept as `Some(Null)` and means "fact is present".
    #[serde(default, deserialize_with = "explicit_value", skip_serializing_if = "Option::is_none")]
    pub ne: Option<Value>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

impl Condition {
    /// Check the condition against a fact value. `None` and JSON `null` both
    /// count as a missing fact.
    pub fn holds(&self, fact: Option<&Value>) -> bool {
        let fact = fact.filter(|value| !value.is_null());
        match self {
            Condition::Equals(Value::Null) => fact.is_none(),
            Condition::Equals(expected) => fact.is_some_and(|value| values_equal(value, expected)),
            Condition::OneOf(options) => fact.is_some_and(|value| {
                options.iter().any(|option| values_equal(value, option))
            }),
            Condition::Operators(ops) => ops.holds(fact),
        }
    }
}

/// Distinguishes an explicit `null` from an absent key.
fn explicit_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn non_null(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

impl Operators {
    fn has_value_checks(&self) -> bool {
        non_null(&self.eq).is_some()
            || non_null(&self.ne).is_some()
            || self.one_of.is_some()
            || self.gt.is_some()
            || self.gte.is_some()
            || self.lt.is_some()
            || self.lte.is_some()
    }

    fn holds(&self, fact: Option<&Value>) -> bool {
        if let Some(expected) = self.exists {
            if expected != fact.is_some() {
                return false;
            }
        }

        if matches!(self.eq, Some(Value::Null)) && fact.is_some() {
            return false;
        }
        if matches!(self.ne, Some(Value::Null)) && fact.is_none() {
            return false;
        }

        let Some(value) = fact else {
            return !self.has_value_checks();
        };

        if let Some(eq) = non_null(&self.eq) {
            if !values_equal(value, eq) {
                return false;
            }
        }
        if let Some(ne) = non_null(&self.ne) {
            if values_equal(value, ne) {
                return false;
            }
        }
        if let Some(options) = &self.one_of {
            if !options.iter().any(|option| values_equal(value, option)) {
                return false;
            }
        }

        // Numeric bounds fail on non-numeric facts.
        let number = value.as_f64();
        let within = |bound: Option<f64>, cmp: fn(f64, f64) -> bool| match bound {
            None => true,
            Some(b) => number.is_some_and(|v| cmp(v, b)),
        };

        within(self.gt, |v, b| v > b)
            && within(self.gte, |v, b| v >= b)
            && within(self.lt, |v, b| v < b)
            && within(self.lte, |v, b| v <= b)
    }
}

/// Numbers compare by value (`1 == 1.0`); everything else structurally.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Resolve a possibly dotted field name against a fact object.
fn lookup<'a>(facts: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(value) = facts.get(field) {
        return Some(value);
    }
    field
        .split('.')
        .try_fold(facts, |current, segment| current.get(segment))
}

// ============================================================================
// RULES
// ============================================================================

fn default_enabled() -> bool {
    true
}

/// One declarative rule: a named, prioritized predicate with an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,

    /// Higher priority rules are evaluated first.
    #[serde(default)]
    pub priority: i64,

    #[serde(default, rename = "match")]
    pub conditions: BTreeMap<String, Condition>,

    /// Opaque outcome handed back to the caller when the rule matches.
    #[serde(default)]
    pub action: Value,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Rule {
    /// Whether this rule applies to the given facts. Disabled rules never
    /// match; an empty `match` block matches everything.
    pub fn matches(&self, facts: &Value) -> bool {
        self.enabled
            && self
                .conditions
                .iter()
                .all(|(field, condition)| condition.holds(lookup(facts, field)))
    }
}

/// Typed view of a rule document, ordered for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    kind: RuleSetKind,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, ordering rules by descending priority. Rules with
    /// equal priority keep their document order.
    pub fn new(kind: RuleSetKind, mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { kind, rules }
    }

    /// Interpret a cached document. The document must carry a `rules` list
    /// with uniquely named entries.
    pub fn from_document(kind: RuleSetKind, document: &RuleDocument) -> Result<Self, RuleError> {
        let invalid = |reason: String| RuleError::InvalidRuleSet {
            kind: kind.to_string(),
            reason,
        };

        let raw = document
            .get("rules")
            .ok_or_else(|| invalid("missing `rules` list".to_string()))?;
        let rules: Vec<Rule> =
            serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))?;

        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = rules.iter().find(|rule| !seen.insert(rule.name.as_str())) {
            return Err(invalid(format!("duplicate rule name '{}'", duplicate.name)));
        }

        Ok(Self::new(kind, rules))
    }

    pub fn kind(&self) -> RuleSetKind {
        self.kind
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The highest-priority rule matching the facts, if any.
    pub fn evaluate(&self, facts: &Value) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.matches(facts))
    }

    /// Every matching rule, highest priority first.
    pub fn evaluate_all(&self, facts: &Value) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.matches(facts)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn routing_set() -> RuleSet {
        let doc = RuleDocument::from_yaml_str(
            r#"
rules:
  - name: fallback
    priority: 0
    action: { assign_to: annual_fund }
  - name: major-gifts
    priority: 100
    match:
      sport: [football, basketball]
      capacity: { gte: 25000 }
    action: { assign_to: major_gifts }
  - name: legacy-gold
    priority: 50
    match:
      donor.tier: gold
    action: { assign_to: legacy_team }
  - name: retired
    priority: 500
    enabled: false
    action: { assign_to: nobody }
"#,
        )
        .expect("fixture yaml parses");
        RuleSet::from_document(RuleSetKind::Routing, &doc).expect("fixture is a valid rule set")
    }

    #[test]
    fn test_rules_sorted_by_priority() {
        let set = routing_set();
        let names: Vec<_> = set.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["retired", "major-gifts", "legacy-gold", "fallback"]);
    }

    #[test]
    fn test_evaluate_picks_highest_priority_match() {
        let set = routing_set();
        let facts = json!({ "sport": "football", "capacity": 50000, "donor": { "tier": "gold" } });
        let rule = set.evaluate(&facts).map(|r| r.name.as_str());
        assert_eq!(rule, Some("major-gifts"));

        let all: Vec<_> = set.evaluate_all(&facts).iter().map(|r| r.name.clone()).collect();
        assert_eq!(all, vec!["major-gifts", "legacy-gold", "fallback"]);
    }

    #[test]
    fn test_disabled_rule_never_matches() {
        let set = routing_set();
        let facts = json!({});
        assert_eq!(set.evaluate(&facts).map(|r| r.name.as_str()), Some("fallback"));
    }

    #[test]
    fn test_dotted_field_lookup() {
        let set = routing_set();
        let facts = json!({ "sport": "golf", "donor": { "tier": "gold" } });
        assert_eq!(set.evaluate(&facts).map(|r| r.name.as_str()), Some("legacy-gold"));
    }

    #[test]
    fn test_operator_conditions() {
        let cond: Condition =
            serde_json::from_value(json!({ "gt": 10, "lte": 20 })).expect("operators parse");
        assert!(matches!(cond, Condition::Operators(_)));
        assert!(cond.holds(Some(&json!(15))));
        assert!(cond.holds(Some(&json!(20.0))));
        assert!(!cond.holds(Some(&json!(10))));
        assert!(!cond.holds(Some(&json!("15"))));
        assert!(!cond.holds(None));
    }

    #[test]
    fn test_explicit_null_equality() {
        let missing: Condition =
            serde_json::from_value(json!({ "eq": null })).expect("operators parse");
        match &missing {
            Condition::Operators(ops) => assert_eq!(ops.eq, Some(Value::Null)),
            other => panic!("unexpected condition: {other:?}"),
        }
        assert!(missing.holds(None));
        assert!(missing.holds(Some(&Value::Null)));
        assert!(!missing.holds(Some(&json!("gold"))));
        assert!(!missing.holds(Some(&json!(0))));

        let present: Condition =
            serde_json::from_value(json!({ "ne": null })).expect("operators parse");
        assert!(present.holds(Some(&json!("gold"))));
        assert!(!present.holds(None));

        let absent_key: Operators = serde_json::from_value(json!({ "gt": 1 })).expect("parse");
        assert_eq!(absent_key.eq, None);
    }

    #[test]
    fn test_explicit_null_in_yaml_rule() {
        let doc = RuleDocument::from_yaml_str(
            r#"
rules:
  - name: unassigned
    match:
      officer: { eq: null }
    action: { queue: routing }
"#,
        )
        .expect("yaml parses");
        let set = RuleSet::from_document(RuleSetKind::Collision, &doc).expect("valid rules");
        assert!(set.evaluate(&json!({ "officer": "jdoe" })).is_none());
        assert!(set.evaluate(&json!({})).is_some());
    }

    #[test]
    fn test_exists_operator() {
        let absent: Condition =
            serde_json::from_value(json!({ "exists": false })).expect("operators parse");
        assert!(absent.holds(None));
        assert!(absent.holds(Some(&Value::Null)));
        assert!(!absent.holds(Some(&json!("x"))));

        let present: Condition =
            serde_json::from_value(json!({ "exists": true })).expect("operators parse");
        assert!(present.holds(Some(&json!(0))));
        assert!(!present.holds(None));
    }

    #[test]
    fn test_in_and_ne_operators() {
        let cond: Condition = serde_json::from_value(json!({ "in": ["a", "b"], "ne": "b" }))
            .expect("operators parse");
        assert!(cond.holds(Some(&json!("a"))));
        assert!(!cond.holds(Some(&json!("b"))));
        assert!(!cond.holds(Some(&json!("c"))));
    }

    #[test]
    fn test_mapping_with_unknown_keys_is_equality() {
        let cond: Condition =
            serde_json::from_value(json!({ "city": "Manhattan" })).expect("condition parses");
        assert!(matches!(cond, Condition::Equals(_)));
        assert!(cond.holds(Some(&json!({ "city": "Manhattan" }))));
        assert!(!cond.holds(Some(&json!({ "city": "Lawrence" }))));
    }

    #[test]
    fn test_numeric_equality_ignores_representation() {
        let cond = Condition::Equals(json!(1));
        assert!(cond.holds(Some(&json!(1.0))));
    }

    #[test]
    fn test_missing_rules_list_is_invalid() {
        let doc = RuleDocument::from_yaml_str("thresholds: []\n").expect("yaml parses");
        let err = RuleSet::from_document(RuleSetKind::ApprovalThresholds, &doc)
            .expect_err("missing rules list must fail");
        assert!(err.to_string().contains("approval_thresholds"));
    }

    #[test]
    fn test_duplicate_rule_names_are_invalid() {
        let doc = RuleDocument::from_yaml_str(
            "rules:\n  - name: a\n  - name: a\n    priority: 3\n",
        )
        .expect("yaml parses");
        let err = RuleSet::from_document(RuleSetKind::Collision, &doc)
            .expect_err("duplicates must fail");
        assert!(err.to_string().contains("duplicate rule name 'a'"));
    }
}
