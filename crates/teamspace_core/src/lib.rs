//! Core domain logic for Teamspace, a multi-tenant project tracker.
//! This crate is the single source of truth for membership, permission and
//! lifecycle invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{bootstrap, BootstrapError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::{Project, ProjectId};
pub use model::role::{permissions_for, Permission, Role};
pub use model::task::{Task, TaskAnalytics, TaskId, TaskPriority, TaskStatus};
pub use model::user::{Account, AuthProvider, User, UserId};
pub use model::workspace::{Member, Workspace, WorkspaceId};
pub use repo::{RepoError, RepoResult};
pub use service::access::{authorize, require_permission, resolve_role};
pub use service::auth_service::{
    AuthService, CredentialVerifier, OAuthLogin, OAuthProfile, RegisterInput, RegisteredUser,
};
pub use service::error::{CoreError, CoreResult, ErrorKind};
pub use service::member_service::MemberService;
pub use service::project_service::{ProjectInput, ProjectPatch, ProjectService};
pub use service::task_service::{TaskFilter, TaskInput, TaskPatch, TaskService};
pub use service::user_service::{CurrentUser, UserService};
pub use service::workspace_service::{
    WorkspaceDetails, WorkspaceInput, WorkspaceMembers, WorkspaceService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
