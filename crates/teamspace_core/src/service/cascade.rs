//! Explicit child-before-parent cascades.
//!
//! The schema declares no `ON DELETE` actions, so removing a workspace or
//! project deletes its dependents here. Each step is idempotent and must run
//! inside the caller's transaction.

use crate::model::project::ProjectId;
use crate::model::workspace::WorkspaceId;
use crate::repo::member_repo::MemberRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::service::error::CoreResult;
use crate::service::Store;

/// Row counts removed or rewritten by a workspace cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorkspaceCascade {
    pub tasks: usize,
    pub projects: usize,
    pub members: usize,
    pub repointed_users: usize,
}

/// Removes every row scoped to `workspace_id`, then the workspace itself.
///
/// Users whose current workspace was `workspace_id` are repointed to the
/// earliest workspace they still belong to, or cleared.
pub(crate) fn delete_workspace_tree(
    store: &Store<'_>,
    workspace_id: WorkspaceId,
) -> CoreResult<WorkspaceCascade> {
    let tasks = store.tasks.delete_tasks_of_workspace(workspace_id)?;
    let projects = store.projects.delete_projects_of_workspace(workspace_id)?;
    let members = store.members.delete_members_of_workspace(workspace_id)?;

    let pointing = store.users.list_users_pointing_at(workspace_id)?;
    for user_id in &pointing {
        let fallback = store.members.first_workspace_of(*user_id)?;
        store.users.set_current_workspace(*user_id, fallback)?;
    }

    store.workspaces.delete_workspace(workspace_id)?;

    Ok(WorkspaceCascade {
        tasks,
        projects,
        members,
        repointed_users: pointing.len(),
    })
}

/// Removes the tasks of `project_id`, then the project. Returns tasks removed.
pub(crate) fn delete_project_tree(store: &Store<'_>, project_id: ProjectId) -> CoreResult<usize> {
    let tasks = store.tasks.delete_tasks_of_project(project_id)?;
    store.projects.delete_project(project_id)?;
    Ok(tasks)
}
