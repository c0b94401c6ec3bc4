//! Permission and role gates.
//!
//! Permissions are all-of, roles are any-of. A user with no permissions (or no
//! roles) recorded at all skips that check entirely. This vacuous pass grants
//! access to users whose claims were never populated; it is kept on purpose
//! and needs product confirmation before anyone tightens it.

use crate::models::User;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What a view requires from the user. `None` or an empty set means no
/// constraint on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<String>>,
}

impl PermissionRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }
}

/// Returns whether `user` satisfies `requirement`.
pub fn evaluate(user: &User, requirement: &PermissionRequirement) -> bool {
    if !user.permissions.is_empty() {
        if let Some(required) = non_empty(&requirement.permissions) {
            let has_all_permissions = required
                .iter()
                .all(|permission| user.permissions.contains(permission));

            if !has_all_permissions {
                return false;
            }
        }
    }

    if !user.roles.is_empty() {
        if let Some(required) = non_empty(&requirement.roles) {
            let has_any_role = required.iter().any(|role| user.roles.contains(role));

            if !has_any_role {
                return false;
            }
        }
    }

    true
}

fn non_empty(set: &Option<BTreeSet<String>>) -> Option<&BTreeSet<String>> {
    set.as_ref().filter(|set| !set.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_without_permissions_passes_vacuously() {
        let user = User::new("a@b.c");
        let requirement = PermissionRequirement::new().permissions(["a"]);
        assert!(evaluate(&user, &requirement));
    }

    #[test]
    fn test_permissions_are_all_of() {
        let user = User::new("a@b.c").with_permissions(["a"]);
        let requirement = PermissionRequirement::new().permissions(["a", "b"]);
        assert!(!evaluate(&user, &requirement));

        let user = user.with_permissions(["a", "b", "c"]);
        assert!(evaluate(&user, &requirement));
    }

    #[test]
    fn test_roles_are_any_of() {
        let user = User::new("a@b.c").with_roles(["x"]);
        let requirement = PermissionRequirement::new().roles(["x", "y"]);
        assert!(evaluate(&user, &requirement));
    }

    #[test]
    fn test_missing_role_fails() {
        let user = User::new("a@b.c").with_roles(["viewer"]);
        let requirement = PermissionRequirement::new().roles(["administrator"]);
        assert!(!evaluate(&user, &requirement));
    }

    #[test]
    fn test_user_without_roles_passes_vacuously() {
        let user = User::new("a@b.c").with_permissions(["metrics.list"]);
        let requirement = PermissionRequirement::new()
            .permissions(["metrics.list"])
            .roles(["administrator"]);
        assert!(evaluate(&user, &requirement));
    }

    #[test]
    fn test_empty_requirement_is_no_constraint() {
        let user = User::new("a@b.c")
            .with_permissions(["users.list"])
            .with_roles(["editor"]);
        assert!(evaluate(&user, &PermissionRequirement::new()));
        assert!(evaluate(
            &user,
            &PermissionRequirement::new()
                .permissions(Vec::<String>::new())
                .roles(Vec::<String>::new())
        ));
    }

    #[test]
    fn test_both_axes_must_pass() {
        let user = User::new("a@b.c")
            .with_permissions(["metrics.list"])
            .with_roles(["editor"]);
        let requirement = PermissionRequirement::new()
            .permissions(["metrics.list"])
            .roles(["administrator"]);
        assert!(!evaluate(&user, &requirement));
    }
}
