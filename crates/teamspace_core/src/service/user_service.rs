//! Current-user lookup.

use crate::model::user::{User, UserId};
use crate::model::workspace::Workspace;
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
use crate::service::error::{CoreError, CoreResult};
use rusqlite::Connection;
use serde::Serialize;

/// Signed-in user with their active workspace resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub user: User,
    pub current_workspace: Option<Workspace>,
}

pub struct UserService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> UserService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns `user_id` without its credential hash, plus the workspace its
    /// pointer references, if any.
    pub fn current_user(&self, user_id: UserId) -> CoreResult<CurrentUser> {
        let users = SqliteUserRepository::try_new(self.conn)?;
        let workspaces = SqliteWorkspaceRepository::try_new(self.conn)?;

        let user = users
            .get_user(user_id)?
            .ok_or(CoreError::UserNotFound(user_id))?;
        let current_workspace = match user.current_workspace {
            Some(workspace_id) => workspaces.get_workspace(workspace_id)?,
            None => None,
        };

        Ok(CurrentUser {
            user: user.without_credential(),
            current_workspace,
        })
    }
}
