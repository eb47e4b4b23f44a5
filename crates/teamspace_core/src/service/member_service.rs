//! Invite-code join flow.
//!
//! # Invariants
//! - Joining twice is rejected, never silently accepted.
//! - Duplicate memberships are prevented by the `(user_id, workspace_id)`
//!   UNIQUE constraint, not by application locking.

use crate::model::now_epoch_ms;
use crate::model::role::Role;
use crate::model::user::UserId;
use crate::model::workspace::{is_well_formed_invite_code, Member, WorkspaceId};
use crate::repo::member_repo::MemberRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::repo::RepoError;
use crate::service::error::{CoreError, CoreResult};
use crate::service::Store;
use log::info;
use rusqlite::Connection;

pub struct MemberService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MemberService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Adds `user_id` to the workspace behind `invite_code` as MEMBER.
    ///
    /// # Errors
    /// - `InviteCodeNotFound` for malformed or unknown codes.
    /// - `AlreadyMember` when a membership exists, including one created by a
    ///   concurrent join.
    /// - `RoleNotFound(Member)` when the role catalog is missing MEMBER.
    pub fn join_workspace(&self, user_id: UserId, invite_code: &str) -> CoreResult<Member> {
        if !is_well_formed_invite_code(invite_code) {
            return Err(CoreError::InviteCodeNotFound);
        }

        let store = Store::open(self.conn)?;
        store
            .users
            .get_user(user_id)?
            .ok_or(CoreError::UserNotFound(user_id))?;
        let workspace = store
            .workspaces
            .find_by_invite_code(invite_code)?
            .ok_or(CoreError::InviteCodeNotFound)?;

        if store.members.find_member(user_id, workspace.id)?.is_some() {
            return Err(CoreError::AlreadyMember {
                user_id,
                workspace_id: workspace.id,
            });
        }

        let member_role = store
            .workspaces
            .find_role(Role::Member)?
            .ok_or(CoreError::RoleNotFound(Role::Member))?;
        let member = store
            .members
            .create_member(user_id, workspace.id, member_role.id, now_epoch_ms())
            .map_err(|err| membership_insert_error(err, user_id, workspace.id))?;

        info!(
            "event=workspace_join module=member status=ok user_id={} workspace_id={}",
            user_id, workspace.id
        );
        Ok(member)
    }
}

/// A UNIQUE failure on `members` means another join won the race.
fn membership_insert_error(
    err: RepoError,
    user_id: UserId,
    workspace_id: WorkspaceId,
) -> CoreError {
    if err.is_unique_violation_on("members") {
        CoreError::AlreadyMember {
            user_id,
            workspace_id,
        }
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::membership_insert_error;
    use crate::repo::RepoError;
    use crate::service::error::{CoreError, ErrorKind};
    use uuid::Uuid;

    #[test]
    fn lost_join_race_maps_to_already_member() {
        let (user_id, workspace_id) = (Uuid::new_v4(), Uuid::new_v4());
        let err = membership_insert_error(
            RepoError::UniqueViolation(
                "UNIQUE constraint failed: members.user_id, members.workspace_id".to_string(),
            ),
            user_id,
            workspace_id,
        );
        assert!(matches!(
            err,
            CoreError::AlreadyMember { user_id: u, workspace_id: w }
                if u == user_id && w == workspace_id
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn other_insert_failures_stay_storage_errors() {
        let unrelated = membership_insert_error(
            RepoError::UniqueViolation(
                "UNIQUE constraint failed: workspaces.invite_code".to_string(),
            ),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert!(matches!(unrelated, CoreError::Storage(_)));

        let broken = membership_insert_error(
            RepoError::InvalidData("bad role".to_string()),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );
        assert_eq!(broken.kind(), ErrorKind::Internal);
    }
}
