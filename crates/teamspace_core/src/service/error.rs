//! Domain error taxonomy for core use-cases.
//!
//! # Invariants
//! - Every failure maps to exactly one `ErrorKind`.
//! - `Display` never includes storage-engine text; the source chain does.

use crate::db::DbError;
use crate::model::project::ProjectId;
use crate::model::role::{Permission, Role};
use crate::model::task::TaskId;
use crate::model::user::{AuthProvider, UserId};
use crate::model::workspace::WorkspaceId;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Stable failure class that callers map to an external status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidReference,
    /// Bad deployment (e.g. missing seed role), not a user error.
    Configuration,
    Unauthorized,
    Internal,
}

impl ErrorKind {
    /// Stable code string for transport layers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::InvalidReference => "INVALID_REFERENCE",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure raised by core services.
#[derive(Debug)]
pub enum CoreError {
    UserNotFound(UserId),
    AccountNotFound(AuthProvider),
    WorkspaceNotFound(WorkspaceId),
    ProjectNotFound(ProjectId),
    TaskNotFound(TaskId),
    MemberNotFound {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    InviteCodeNotFound,
    NotAMember {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    MissingPermission {
        role: Role,
        required_one_of: Vec<Permission>,
    },
    NotWorkspaceOwner {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    /// The workspace owner's membership always keeps `Role::Owner`.
    OwnerRoleImmutable(WorkspaceId),
    EmailAlreadyExists,
    AlreadyMember {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    InviteCodeCollision,
    AssigneeNotMember {
        user_id: UserId,
        workspace_id: WorkspaceId,
    },
    ProjectWorkspaceMismatch {
        project_id: ProjectId,
        workspace_id: WorkspaceId,
    },
    TaskProjectMismatch {
        task_id: TaskId,
        project_id: ProjectId,
    },
    RoleNotFound(Role),
    InvalidCredentials,
    Storage(RepoError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_)
            | Self::AccountNotFound(_)
            | Self::WorkspaceNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::TaskNotFound(_)
            | Self::MemberNotFound { .. }
            | Self::InviteCodeNotFound => ErrorKind::NotFound,
            Self::NotAMember { .. }
            | Self::MissingPermission { .. }
            | Self::NotWorkspaceOwner { .. }
            | Self::OwnerRoleImmutable(_) => ErrorKind::Forbidden,
            Self::EmailAlreadyExists | Self::AlreadyMember { .. } | Self::InviteCodeCollision => {
                ErrorKind::Conflict
            }
            Self::AssigneeNotMember { .. }
            | Self::ProjectWorkspaceMismatch { .. }
            | Self::TaskProjectMismatch { .. } => ErrorKind::InvalidReference,
            Self::RoleNotFound(_) => ErrorKind::Configuration,
            Self::InvalidCredentials => ErrorKind::Unauthorized,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::AccountNotFound(provider) => write!(f, "{provider} account not found"),
            Self::WorkspaceNotFound(id) => write!(f, "workspace not found: {id}"),
            Self::ProjectNotFound(id) => write!(
                f,
                "project not found or does not belong to this workspace: {id}"
            ),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::MemberNotFound { user_id, .. } => {
                write!(f, "member not found in the workspace: {user_id}")
            }
            Self::InviteCodeNotFound => write!(f, "invalid invite code or workspace not found"),
            Self::NotAMember { .. } => write!(f, "you are not a member of this workspace"),
            Self::MissingPermission { .. } => {
                write!(f, "you do not have the necessary permissions to perform this action")
            }
            Self::NotWorkspaceOwner { .. } => {
                write!(f, "you are not authorized to delete this workspace")
            }
            Self::OwnerRoleImmutable(_) => write!(f, "the workspace owner's role cannot change"),
            Self::EmailAlreadyExists => write!(f, "email already exists"),
            Self::AlreadyMember { .. } => write!(f, "you are already a member of this workspace"),
            Self::InviteCodeCollision => write!(f, "could not allocate a unique invite code"),
            Self::AssigneeNotMember { user_id, .. } => write!(
                f,
                "assigned user is not a member of this workspace: {user_id}"
            ),
            Self::ProjectWorkspaceMismatch { project_id, .. } => write!(
                f,
                "project does not belong to this workspace: {project_id}"
            ),
            Self::TaskProjectMismatch { task_id, .. } => {
                write!(f, "task does not belong to this project: {task_id}")
            }
            Self::RoleNotFound(role) => write!(f, "{role} role not found"),
            Self::InvalidCredentials => write!(f, "invalid email or password"),
            Self::Storage(_) => write!(f, "internal storage error"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::Storage(value.into())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.into())
    }
}
