//! Project use-case service.
//!
//! # Invariants
//! - Projects are only visible through the workspace that owns them; a
//!   project of another workspace reads as `ProjectNotFound`.
//! - Deleting a project removes its tasks first, in the same transaction.

use crate::model::now_epoch_ms;
use crate::model::project::{Project, ProjectId, DEFAULT_PROJECT_EMOJI};
use crate::model::role::Permission;
use crate::model::task::TaskAnalytics;
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::repo::project_repo::{NewProject, ProjectRepository};
use crate::repo::task_repo::{AnalyticsScope, TaskRepository};
use crate::service::access::authorize;
use crate::service::cascade::delete_project_tree;
use crate::service::error::{CoreError, CoreResult};
use crate::service::{in_transaction, Store};
use log::info;
use rusqlite::Connection;

/// Input for project creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectInput {
    pub name: String,
    pub description: Option<String>,
    /// Falls back to `DEFAULT_PROJECT_EMOJI`.
    pub emoji: Option<String>,
}

/// Partial project update.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub emoji: Option<String>,
}

pub struct ProjectService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ProjectService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn create_project(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        input: &ProjectInput,
    ) -> CoreResult<Project> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::CreateProject],
        )?;
        let project = store.projects.create_project(&NewProject {
            workspace_id,
            name: &input.name,
            description: input.description.as_deref(),
            emoji: input.emoji.as_deref().unwrap_or(DEFAULT_PROJECT_EMOJI),
            created_by: actor,
        })?;
        info!(
            "event=project_create module=project status=ok workspace_id={} project_id={}",
            workspace_id, project.id
        );
        Ok(project)
    }

    /// Lists projects of the workspace, newest first.
    pub fn list_projects(&self, actor: UserId, workspace_id: WorkspaceId) -> CoreResult<Vec<Project>> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        Ok(store.projects.list_projects(workspace_id)?)
    }

    pub fn get_project(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    ) -> CoreResult<Project> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        scoped_project(&store, workspace_id, project_id)
    }

    pub fn project_analytics(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    ) -> CoreResult<TaskAnalytics> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        scoped_project(&store, workspace_id, project_id)?;
        Ok(store
            .tasks
            .analytics(AnalyticsScope::Project(project_id), now_epoch_ms())?)
    }

    pub fn update_project(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
        patch: &ProjectPatch,
    ) -> CoreResult<Project> {
        in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::EditProject],
            )?;
            let mut project = scoped_project(store, workspace_id, project_id)?;
            if let Some(name) = &patch.name {
                project.name = name.clone();
            }
            if let Some(description) = &patch.description {
                project.description = description.clone();
            }
            if let Some(emoji) = &patch.emoji {
                project.emoji = emoji.clone();
            }
            store.projects.update_project(&project)?;
            scoped_project(store, workspace_id, project_id)
        })
    }

    /// Deletes a project and its tasks. Returns the number of tasks removed.
    pub fn delete_project(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
    ) -> CoreResult<usize> {
        let removed_tasks = in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::DeleteProject],
            )?;
            scoped_project(store, workspace_id, project_id)?;
            delete_project_tree(store, project_id)
        })?;
        info!(
            "event=project_delete module=project status=ok workspace_id={} project_id={} tasks={}",
            workspace_id, project_id, removed_tasks
        );
        Ok(removed_tasks)
    }
}

/// Loads `project_id` only if it belongs to `workspace_id`.
pub(crate) fn scoped_project(
    store: &Store<'_>,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
) -> CoreResult<Project> {
    match store.projects.get_project(project_id)? {
        Some(project) if project.workspace_id == workspace_id => Ok(project),
        _ => Err(CoreError::ProjectNotFound(project_id)),
    }
}
