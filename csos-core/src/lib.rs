//! CSOS Core - Rule and Role Types
//!
//! Shared data types for the KSU CSOS rules service. Every other crate in
//! the workspace depends on this one.
//!
//! - [`RuleSetKind`] / [`RuleDocument`]: the three declarative rule sets and
//!   their opaque parsed form, as held by the rule cache.
//! - [`RuleSet`] / [`Rule`] / [`Condition`]: the typed view used by the
//!   routing, collision and approval decision logic.
//! - [`UserRoles`] / [`RoleAssignment`]: role data for the authorization gate.

pub mod error;
pub mod matcher;
pub mod roles;
pub mod rules;

pub use error::{ConfigError, RuleError};
pub use matcher::{Condition, Operators, Rule, RuleSet};
pub use roles::{group_assignments, is_privileged, RoleAssignment, UserRoles, PRIVILEGED_ROLES};
pub use rules::{RuleDocument, RuleSetKind, RULES_BUCKET};

/// User identifier issued by the identity backend.
pub type UserId = uuid::Uuid;
