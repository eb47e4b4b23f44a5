//! Task use-case service.
//!
//! # Invariants
//! - A task's project belongs to the task's workspace.
//! - A task is only assigned to members of its workspace.

use crate::model::project::ProjectId;
use crate::model::role::Permission;
use crate::model::task::{Task, TaskId, TaskPriority, TaskStatus};
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::repo::member_repo::MemberRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::{NewTask, TaskListQuery, TaskRepository};
use crate::service::access::authorize;
use crate::service::error::{CoreError, CoreResult};
use crate::service::{in_transaction, Store};
use log::info;
use rusqlite::Connection;

/// Input for task creation. Status and priority default to TODO / MEDIUM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<i64>,
}

/// Partial task update.
///
/// Outer `None` leaves a field unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Option<UserId>>,
    pub due_date: Option<Option<i64>>,
}

/// Listing filter; empty vectors do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: Option<ProjectId>,
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub assignees: Vec<UserId>,
    pub keyword: Option<String>,
    pub due_date: Option<i64>,
}

pub struct TaskService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> TaskService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// # Errors
    /// - `ProjectNotFound` when the project does not exist.
    /// - `ProjectWorkspaceMismatch` when it belongs to another workspace.
    /// - `AssigneeNotMember` when the assignee is not a workspace member.
    pub fn create_task(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
        input: &TaskInput,
    ) -> CoreResult<Task> {
        let task = in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::CreateTask],
            )?;
            let project = store
                .projects
                .get_project(project_id)?
                .ok_or(CoreError::ProjectNotFound(project_id))?;
            if project.workspace_id != workspace_id {
                return Err(CoreError::ProjectWorkspaceMismatch {
                    project_id,
                    workspace_id,
                });
            }
            if let Some(assignee) = input.assigned_to {
                ensure_assignee_is_member(store, assignee, workspace_id)?;
            }

            Ok(store.tasks.create_task(&NewTask {
                workspace_id,
                project_id,
                title: &input.title,
                description: input.description.as_deref(),
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                assigned_to: input.assigned_to,
                created_by: actor,
                due_date: input.due_date,
            })?)
        })?;
        info!(
            "event=task_create module=task status=ok workspace_id={} project_id={} task_id={}",
            workspace_id, project_id, task.id
        );
        Ok(task)
    }

    /// # Errors
    /// - `TaskProjectMismatch` when the task belongs to another project.
    /// - `AssigneeNotMember` when the new assignee is not a member.
    pub fn update_task(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> CoreResult<Task> {
        in_transaction(self.conn, |store| {
            authorize(
                &store.workspaces,
                &store.members,
                actor,
                workspace_id,
                &[Permission::EditTask],
            )?;
            let mut task = scoped_task(store, workspace_id, project_id, task_id)?;

            if let Some(title) = &patch.title {
                task.title = title.clone();
            }
            if let Some(description) = &patch.description {
                task.description = description.clone();
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(assigned_to) = patch.assigned_to {
                if let Some(assignee) = assigned_to {
                    ensure_assignee_is_member(store, assignee, workspace_id)?;
                }
                task.assigned_to = assigned_to;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }

            store.tasks.update_task(&task)?;
            store
                .tasks
                .get_task(task_id)?
                .ok_or(CoreError::TaskNotFound(task_id))
        })
    }

    /// Lists tasks of the workspace matching `filter`, newest first.
    pub fn list_tasks(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        filter: &TaskFilter,
    ) -> CoreResult<Vec<Task>> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        let query = TaskListQuery {
            project_id: filter.project_id,
            statuses: filter.statuses.clone(),
            priorities: filter.priorities.clone(),
            assignees: filter.assignees.clone(),
            keyword: filter
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_string),
            due_date: filter.due_date,
            ..TaskListQuery::for_workspace(workspace_id)
        };
        Ok(store.tasks.list_tasks(&query)?)
    }

    pub fn get_task(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        project_id: ProjectId,
        task_id: TaskId,
    ) -> CoreResult<Task> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::ViewOnly],
        )?;
        scoped_task(&store, workspace_id, project_id, task_id)
    }

    pub fn delete_task(
        &self,
        actor: UserId,
        workspace_id: WorkspaceId,
        task_id: TaskId,
    ) -> CoreResult<()> {
        let store = Store::open(self.conn)?;
        authorize(
            &store.workspaces,
            &store.members,
            actor,
            workspace_id,
            &[Permission::DeleteTask],
        )?;
        if !store.tasks.delete_task(task_id, workspace_id)? {
            return Err(CoreError::TaskNotFound(task_id));
        }
        info!(
            "event=task_delete module=task status=ok workspace_id={} task_id={}",
            workspace_id, task_id
        );
        Ok(())
    }
}

/// Loads a task of `workspace_id`, checking it belongs to `project_id`.
fn scoped_task(
    store: &Store<'_>,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    task_id: TaskId,
) -> CoreResult<Task> {
    let task = match store.tasks.get_task(task_id)? {
        Some(task) if task.workspace_id == workspace_id => task,
        _ => return Err(CoreError::TaskNotFound(task_id)),
    };
    if task.project_id != project_id {
        return Err(CoreError::TaskProjectMismatch {
            task_id,
            project_id,
        });
    }
    Ok(task)
}

fn ensure_assignee_is_member(
    store: &Store<'_>,
    assignee: UserId,
    workspace_id: WorkspaceId,
) -> CoreResult<()> {
    if store.members.find_member(assignee, workspace_id)?.is_none() {
        return Err(CoreError::AssigneeNotMember {
            user_id: assignee,
            workspace_id,
        });
    }
    Ok(())
}
