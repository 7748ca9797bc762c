//! Role based permissions on a layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::draft::LayerDraft;

/// A user role known to the admin backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

impl Role {
    /// Key used for the role in `role_permissions`.
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

/// A grantable permission, e.g. "VIEW_LAYER".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionType {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl LayerDraft {
    /// Whether any role has at least one permission.
    pub fn has_any_permissions(&self) -> bool {
        self.role_permissions.values().any(|p| !p.is_empty())
    }

    /// Make sure every known role has an entry so the permission table
    /// lists it.
    pub fn with_initialized_permissions(mut self, roles: &[Role]) -> Self {
        for role in roles {
            self.role_permissions.entry(role.key()).or_default();
        }
        self
    }

    /// Flip one permission for one role.
    pub fn toggle_permission(mut self, role: &str, permission: &str) -> Self {
        let granted = self.role_permissions.entry(role.to_string()).or_default();
        if !granted.remove(permission) {
            granted.insert(permission.to_string());
        }
        self
    }

    /// Grant or revoke a permission for every role in the table.
    pub fn with_permission_for_all(mut self, permission: &str, enabled: bool) -> Self {
        for granted in self.role_permissions.values_mut() {
            if enabled {
                granted.insert(permission.to_string());
            } else {
                granted.remove(permission);
            }
        }
        self
    }

    /// Permissions granted to a role.
    pub fn permissions_for(&self, role: &str) -> Option<&BTreeSet<String>> {
        self.role_permissions.get(role)
    }
}
