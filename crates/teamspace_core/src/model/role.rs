//! Role/permission registry.
//!
//! # Responsibility
//! - Enumerate the fixed roles and permission tokens.
//! - Map each role to its immutable permission set.
//!
//! # Invariants
//! - The registry is built once per process and never mutated afterwards.
//! - `permissions_for` is total over `Role` and never empty.
//! - Every role holds `Permission::ViewOnly`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Action token checked by the permission guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    CreateWorkspace,
    DeleteWorkspace,
    EditWorkspace,
    ManageWorkspaceSettings,
    AddMember,
    ChangeMemberRole,
    RemoveMember,
    CreateProject,
    EditProject,
    DeleteProject,
    CreateTask,
    EditTask,
    DeleteTask,
    ViewOnly,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Self::CreateWorkspace,
        Self::DeleteWorkspace,
        Self::EditWorkspace,
        Self::ManageWorkspaceSettings,
        Self::AddMember,
        Self::ChangeMemberRole,
        Self::RemoveMember,
        Self::CreateProject,
        Self::EditProject,
        Self::DeleteProject,
        Self::CreateTask,
        Self::EditTask,
        Self::DeleteTask,
        Self::ViewOnly,
    ];

    /// Stable token used in storage and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateWorkspace => "CREATE_WORKSPACE",
            Self::DeleteWorkspace => "DELETE_WORKSPACE",
            Self::EditWorkspace => "EDIT_WORKSPACE",
            Self::ManageWorkspaceSettings => "MANAGE_WORKSPACE_SETTINGS",
            Self::AddMember => "ADD_MEMBER",
            Self::ChangeMemberRole => "CHANGE_MEMBER_ROLE",
            Self::RemoveMember => "REMOVE_MEMBER",
            Self::CreateProject => "CREATE_PROJECT",
            Self::EditProject => "EDIT_PROJECT",
            Self::DeleteProject => "DELETE_PROJECT",
            Self::CreateTask => "CREATE_TASK",
            Self::EditTask => "EDIT_TASK",
            Self::DeleteTask => "DELETE_TASK",
            Self::ViewOnly => "VIEW_ONLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == value)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workspace-scoped role carried by every membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl Role {
    pub const ALL: [Role; 3] = [Self::Owner, Self::Admin, Self::Member];

    /// Stable role name; unique in the `roles` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OWNER" => Some(Self::Owner),
            "ADMIN" => Some(Self::Admin),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }

    /// Shorthand for `permissions_for(self)`.
    pub fn permissions(self) -> &'static BTreeSet<Permission> {
        permissions_for(self)
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        permissions_for(self).contains(&permission)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AddMember,
    Permission::CreateProject,
    Permission::EditProject,
    Permission::DeleteProject,
    Permission::CreateTask,
    Permission::EditTask,
    Permission::DeleteTask,
    Permission::ManageWorkspaceSettings,
    Permission::ViewOnly,
];

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::ViewOnly,
    Permission::CreateTask,
    Permission::EditTask,
];

static ROLE_PERMISSIONS: Lazy<BTreeMap<Role, BTreeSet<Permission>>> = Lazy::new(|| {
    BTreeMap::from([
        (Role::Owner, Permission::ALL.into_iter().collect()),
        (Role::Admin, ADMIN_PERMISSIONS.iter().copied().collect()),
        (Role::Member, MEMBER_PERMISSIONS.iter().copied().collect()),
    ])
});

static EMPTY: BTreeSet<Permission> = BTreeSet::new();

/// Returns the fixed permission set for `role`.
pub fn permissions_for(role: Role) -> &'static BTreeSet<Permission> {
    // Every variant is inserted above; the fallback is unreachable.
    ROLE_PERMISSIONS.get(&role).unwrap_or(&EMPTY)
}

#[cfg(test)]
mod tests {
    use super::{permissions_for, Permission, Role};

    #[test]
    fn owner_holds_every_permission() {
        let owner = permissions_for(Role::Owner);
        assert_eq!(owner.len(), Permission::ALL.len());
        for permission in Permission::ALL {
            assert!(owner.contains(&permission), "owner lacks {permission}");
        }
    }

    #[test]
    fn every_role_can_view() {
        for role in Role::ALL {
            assert!(role.has_permission(Permission::ViewOnly), "{role} cannot view");
            assert!(!permissions_for(role).is_empty());
        }
    }

    #[test]
    fn admin_cannot_manage_workspace_lifecycle_or_roles() {
        for permission in [
            Permission::CreateWorkspace,
            Permission::EditWorkspace,
            Permission::DeleteWorkspace,
            Permission::ChangeMemberRole,
            Permission::RemoveMember,
        ] {
            assert!(!Role::Admin.has_permission(permission));
        }
        assert!(Role::Admin.has_permission(Permission::ManageWorkspaceSettings));
        assert!(Role::Admin.has_permission(Permission::DeleteProject));
    }

    #[test]
    fn member_is_limited_to_view_and_task_edits() {
        let member = permissions_for(Role::Member);
        let expected = [
            Permission::ViewOnly,
            Permission::CreateTask,
            Permission::EditTask,
        ];
        assert_eq!(member.len(), expected.len());
        for permission in expected {
            assert!(member.contains(&permission));
        }
        assert!(!member.contains(&Permission::ManageWorkspaceSettings));
    }

    #[test]
    fn registry_is_deterministic() {
        for role in Role::ALL {
            assert!(std::ptr::eq(permissions_for(role), permissions_for(role)));
        }
    }

    #[test]
    fn tokens_parse_back() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.as_str()), Some(permission));
        }
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(Permission::parse("VIEW"), None);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&Permission::ManageWorkspaceSettings).unwrap(),
            "\"MANAGE_WORKSPACE_SETTINGS\""
        );
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
    }
}
