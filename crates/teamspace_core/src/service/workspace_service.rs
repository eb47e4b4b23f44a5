//! Workspace lifecycle and administration.
//!
//! # Responsibility
//! - Create, read, update and delete workspaces.
//! - Manage member roles, invite codes and the caller's active workspace.
//!
//! # Invariants
//! - Only the owner may delete a workspace, whatever their role grants.
//! - Deletion removes tasks, projects and memberships before the workspace,
//!   and repoints every user whose active workspace was the deleted one.
//! - The owner's membership keeps `Role::Owner`.

use crate::model::now_epoch_ms;
use crate::model::role::{Permission, Role};
use crate::model::task::TaskAnalytics;
use crate::model::user::UserId;
use crate::model::workspace::{Member, Workspace, WorkspaceId};
use crate::repo::member_repo::{MemberProfile, MemberRepository};
use crate::repo::task_repo::{AnalyticsScope, TaskRepository};
use crate::repo::user_repo::UserRepository;
use crate::repo::workspace_repo::{RoleRecord, WorkspaceRepository};
use crate::service::access::{authorize, resolve_role};
use crate::service::cascade::delete_workspace_tree;
use crate::service::error::{CoreError, CoreResult};
use crate::service::provision::{provision_workspace, with_fresh_invite_code};
use crate::service::{in_transaction, Store};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;

/// Input for explicit workspace creation and updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceInput {
    pub name: String,
    pub description: Option<String>,
}

/// Workspace together with its member listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceDetails {
    pub workspace: Workspace,
    pub members: Vec<MemberProfile>,
}

/// Member listing plus the role catalog used to re-role them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceMembers {
    pub members: Vec<MemberProfile>,
    pub roles: Vec<RoleRecord>,
}

pub struct WorkspaceService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> WorkspaceService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Creates a workspace owned by `actor` and makes it their active one.
    pub fn create_workspace(&self, actor: UserId, input: &WorkspaceInput) -> CoreResult<Workspace> {
        let workspace = in_transaction(self.conn, |store| {
            store
                .users
                .get_user(actor)?
                .ok_or(CoreError::UserNotFound(actor))?;
            let (workspace, _) =
                provision_workspace(store, actor, &input.name, input.description.as_deref())?;
            Ok(workspace)
        })?;
        info!(
            "event=workspace_create module=workspace status=ok user_id={} workspace_id={}",
            actor, workspace.id
        );
        Ok(workspace)
    }

    /// Lists the workspaces `actor` belongs to, oldest membership first.
    pub fn list_workspaces(&self, actor: UserId) -> CoreResult<Vec<Workspace>> {
        let store = Store::open(self.conn)?;
        Ok(store.workspaces.list_for_member(actor)?)
    }

    pub fn get_workspace(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
    ) -> CoreResult<WorkspaceDetails> {
        let store = Store::open(self.conn)?;
        resolve_role(&store.workspaces, &store.members, actor, workspace_id)?;
        let workspace = store
            .workspaces
            .get_workspace(workspace_id)?
            .ok_or(CoreError::WorkspaceNotFound(workspace_id))?;
        let members = store.members.list_members(workspace_id)?;
        Ok(WorkspaceDetails { workspace, members })
    }

    pub fn list_members(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
    ) -> CoreResult<WorkspaceMembers> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        Ok(WorkspaceMembers {
            members: store.members.list_members(workspace_id)?,
            roles: store.workspaces.list_roles()?,
        })
    }

    /// Task counters across every project of the workspace.
    pub fn analytics(&self, actor: UserId, workspace_id: WorkspaceId) -> CoreResult<TaskAnalytics> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        Ok(store
            .tasks
            .analytics(AnalyticsScope::Workspace(workspace_id), now_epoch_ms())?)
    }

    /// Renames a workspace; `description: None` keeps the current one.
    pub fn update_workspace(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        input: &WorkspaceInput,
    ) -> CoreResult<Workspace> {
        in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::EditWorkspace],
            )?;
            let current = store
                .workspaces
                .get_workspace(workspace_id)?
                .ok_or(CoreError::WorkspaceNotFound(workspace_id))?;
            let description = input.description.as_deref().or(current.description.as_deref());
            store
                .workspaces
                .update_workspace(workspace_id, &input.name, description)?;
            store
                .workspaces
                .get_workspace(workspace_id)?
                .ok_or(CoreError::WorkspaceNotFound(workspace_id))
        })
    }

    /// Assigns `role` to the membership of `member_user_id`.
    ///
    /// # Errors
    /// - `OwnerRoleImmutable` when targeting the workspace owner.
    /// - `MemberNotFound` when the user holds no membership here.
    pub fn change_member_role(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        member_user_id: UserId,
        role: Role,
    ) -> CoreResult<Member> {
        let member = in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::ChangeMemberRole],
            )?;
            let workspace = store
                .workspaces
                .get_workspace(workspace_id)?
                .ok_or(CoreError::WorkspaceNotFound(workspace_id))?;
            if workspace.owner == member_user_id {
                return Err(CoreError::OwnerRoleImmutable(workspace_id));
            }

            let role_row = store
                .workspaces
                .find_role(role)?
                .ok_or(CoreError::RoleNotFound(role))?;
            let member = store
                .members
                .find_member(member_user_id, workspace_id)?
                .ok_or(CoreError::MemberNotFound {
                    user_id: member_user_id,
                    workspace_id,
                })?;
            store.members.set_member_role(member.id, role_row.id)?;
            Ok(Member { role, ..member })
        })?;
        info!(
            "event=member_role_change module=workspace status=ok workspace_id={} member_id={} role={}",
            workspace_id, member.id, role
        );
        Ok(member)
    }

    /// Replaces the invite code; the previous code stops resolving at once.
    pub fn regenerate_invite_code(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
    ) -> CoreResult<Workspace> {
        in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::ManageWorkspaceSettings],
            )?;
            with_fresh_invite_code(|code| store.workspaces.set_invite_code(workspace_id, code))?;
            store
                .workspaces
                .get_workspace(workspace_id)?
                .ok_or(CoreError::WorkspaceNotFound(workspace_id))
        })
    }

    /// Makes `workspace_id` the active workspace of `actor`.
    pub fn switch_workspace(&self, actor: UserId, workspace_id: WorkspaceId) -> CoreResult<Workspace> {
        let store = Store::open(self.conn)?;
        resolve_role(&store.workspaces, &store.members, actor, workspace_id)?;
        store.users.set_current_workspace(actor, Some(workspace_id))?;
        store
            .workspaces
            .get_workspace(workspace_id)?
            .ok_or(CoreError::WorkspaceNotFound(workspace_id))
    }

    /// Deletes a workspace with every row scoped to it.
    ///
    /// Returns the actor's active workspace after the cascade.
    ///
    /// # Errors
    /// - `MissingPermission` without `DELETE_WORKSPACE`.
    /// - `NotWorkspaceOwner` when the actor is not the owner.
    pub fn delete_workspace(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
    ) -> CoreResult<Option<WorkspaceId>> {
        let started_at = Instant::now();
        info!(
            "event=workspace_delete module=workspace status=start workspace_id={}",
            workspace_id
        );
        let result = in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::DeleteWorkspace],
            )?;
            let workspace = store
                .workspaces
                .get_workspace(workspace_id)?
                .ok_or(CoreError::WorkspaceNotFound(workspace_id))?;
            if workspace.owner != actor {
                return Err(CoreError::NotWorkspaceOwner {
                    user_id: actor,
                    workspace_id,
                });
            }

            let cascade = delete_workspace_tree(store, workspace_id)?;
            let next = store
                .users
                .get_user(actor)?
                .ok_or(CoreError::UserNotFound(actor))?
                .current_workspace;
            Ok((cascade, next))
        });

        match result {
            Ok((cascade, next)) => {
                info!(
                    "event=workspace_delete module=workspace status=ok workspace_id={} tasks={} projects={} members={} repointed_users={} duration_ms={}",
                    workspace_id,
                    cascade.tasks,
                    cascade.projects,
                    cascade.members,
                    cascade.repointed_users,
                    started_at.elapsed().as_millis()
                );
                Ok(next)
            }
            Err(err) => {
                warn!(
                    "event=workspace_delete module=workspace status=error workspace_id={} kind={} duration_ms={}",
                    workspace_id,
                    err.kind(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}
