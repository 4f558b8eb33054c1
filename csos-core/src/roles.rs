//! Role assignments for the authorization gate.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Roles allowed to inspect other users' roles and administer the rule cache.
pub const PRIVILEGED_ROLES: &[&str] = &["admin", "super_admin"];

/// Whether any of the given roles is privileged.
pub fn is_privileged<S: AsRef<str>>(roles: &[S]) -> bool {
    roles
        .iter()
        .any(|role| PRIVILEGED_ROLES.contains(&role.as_ref()))
}

/// A single `(user, role)` row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoleAssignment {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    pub role: String,
}

/// All roles held by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UserRoles {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    pub roles: Vec<String>,
}

/// Group flat assignments by user.
///
/// Users come back ordered by id; each user's roles keep their first-seen
/// order with duplicates dropped.
pub fn group_assignments(assignments: Vec<RoleAssignment>) -> Vec<UserRoles> {
    let mut grouped: std::collections::BTreeMap<UserId, Vec<String>> =
        std::collections::BTreeMap::new();

    for RoleAssignment { user_id, role } in assignments {
        let roles = grouped.entry(user_id).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    grouped
        .into_iter()
        .map(|(user_id, roles)| UserRoles { user_id, roles })
        .collect()
}
