//! Membership resolution and permission guard.
//!
//! # Responsibility
//! - Resolve the role a user holds in a workspace.
//! - Reject operations whose required permissions the role lacks.
//!
//! # Invariants
//! - Every workspace-scoped operation passes through `authorize` (or
//!   `resolve_role` + `require_permission`) before reading or writing data.
//! - Checks are pure reads; they never mutate state.

use crate::model::role::{Permission, Role};
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::repo::member_repo::MemberRepository;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::service::error::{CoreError, CoreResult};
use log::warn;

/// Returns the role `user_id` holds in `workspace_id`.
///
/// # Errors
/// - `WorkspaceNotFound` when the workspace does not exist.
/// - `NotAMember` when the user holds no membership there.
pub fn resolve_role<W, M>(
    workspaces: &W,
    members: &M,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> CoreResult<Role>
where
    W: WorkspaceRepository + ?Sized,
    M: MemberRepository + ?Sized,
{
    if workspaces.get_workspace(workspace_id)?.is_none() {
        return Err(CoreError::WorkspaceNotFound(workspace_id));
    }
    match members.find_member(user_id, workspace_id)? {
        Some(member) => Ok(member.role),
        None => {
            warn!(
                "event=access_denied module=access status=denied reason=not_member user_id={} workspace_id={}",
                user_id, workspace_id
            );
            Err(CoreError::NotAMember {
                user_id,
                workspace_id,
            })
        }
    }
}

/// Passes when `role` holds at least one of `required_one_of`.
///
/// An empty requirement list always passes.
pub fn require_permission(role: Role, required_one_of: &[Permission]) -> CoreResult<()> {
    if required_one_of.is_empty()
        || required_one_of
            .iter()
            .any(|permission| role.has_permission(*permission))
    {
        return Ok(());
    }

    warn!(
        "event=access_denied module=access status=denied reason=missing_permission role={} required={}",
        role,
        join_permissions(required_one_of)
    );
    Err(CoreError::MissingPermission {
        role,
        required_one_of: required_one_of.to_vec(),
    })
}

/// Resolves the caller's role, then checks `required_one_of` against it.
pub fn authorize<W, M>(
    workspaces: &W,
    members: &M,
    user_id: UserId,
    workspace_id: WorkspaceId,
    required_one_of: &[Permission],
) -> CoreResult<Role>
where
    W: WorkspaceRepository + ?Sized,
    M: MemberRepository + ?Sized,
{
    let role = resolve_role(workspaces, members, user_id, workspace_id)?;
    require_permission(role, required_one_of)?;
    Ok(role)
}

fn join_permissions(permissions: &[Permission]) -> String {
    permissions
        .iter()
        .map(|permission| permission.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::require_permission;
    use crate::model::role::{Permission, Role};
    use crate::service::error::{CoreError, ErrorKind};

    #[test]
    fn empty_requirement_always_passes() {
        for role in Role::ALL {
            assert!(require_permission(role, &[]).is_ok());
        }
    }

    #[test]
    fn any_one_required_permission_is_enough() {
        require_permission(
            Role::Member,
            &[Permission::DeleteProject, Permission::CreateTask],
        )
        .expect("member can create tasks");
    }

    #[test]
    fn member_cannot_delete_projects() {
        let err = require_permission(Role::Member, &[Permission::DeleteProject])
            .expect_err("member lacks DELETE_PROJECT");
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        match err {
            CoreError::MissingPermission {
                role,
                required_one_of,
            } => {
                assert_eq!(role, Role::Member);
                assert_eq!(required_one_of, vec![Permission::DeleteProject]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn owner_passes_every_single_permission() {
        for permission in Permission::ALL {
            require_permission(Role::Owner, &[permission]).expect("owner holds everything");
        }
    }
}
