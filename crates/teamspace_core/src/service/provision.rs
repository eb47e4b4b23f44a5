//! Workspace provisioning shared by sign-up and explicit workspace creation.
//!
//! Must run inside the caller's transaction: it writes the workspace, the
//! owner membership and the owner's current-workspace pointer.

use crate::model::now_epoch_ms;
use crate::model::role::Role;
use crate::model::user::UserId;
use crate::model::workspace::{generate_invite_code, Member, Workspace};
use crate::repo::member_repo::MemberRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::repo::RepoError;
use crate::service::error::{CoreError, CoreResult};
use crate::service::Store;
use log::warn;

/// Attempts made to draw an unused invite code.
pub(crate) const INVITE_CODE_ATTEMPTS: usize = 3;

/// Creates a workspace owned by `owner`, an OWNER membership for them and
/// points their current workspace at it.
///
/// # Errors
/// - `RoleNotFound(Owner)` when the role catalog was not seeded.
/// - `InviteCodeCollision` when every drawn code is taken.
pub(crate) fn provision_workspace(
    store: &Store<'_>,
    owner: UserId,
    name: &str,
    description: Option<&str>,
) -> CoreResult<(Workspace, Member)> {
    let workspace = with_fresh_invite_code(|code| {
        store
            .workspaces
            .create_workspace(name, description, owner, code)
    })?;

    let owner_role = store
        .workspaces
        .find_role(Role::Owner)?
        .ok_or(CoreError::RoleNotFound(Role::Owner))?;
    let member = store
        .members
        .create_member(owner, workspace.id, owner_role.id, now_epoch_ms())?;
    store
        .users
        .set_current_workspace(owner, Some(workspace.id))?;

    Ok((workspace, member))
}

/// Runs `write` with freshly generated invite codes until one is accepted.
///
/// A UNIQUE failure only aborts the failing statement, so retrying inside
/// an open transaction is safe.
pub(crate) fn with_fresh_invite_code<T>(
    mut write: impl FnMut(&str) -> Result<T, RepoError>,
) -> CoreResult<T> {
    for attempt in 1..=INVITE_CODE_ATTEMPTS {
        let code = generate_invite_code();
        match write(&code) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_unique_violation_on("workspaces") => {
                warn!(
                    "event=invite_code_collision module=workspace status=retry attempt={}",
                    attempt
                );
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(CoreError::InviteCodeCollision)
}
