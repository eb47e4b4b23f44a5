//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction scope: every multi-row write commits or rolls back whole.
//! - Route every workspace-scoped call through `access` before touching data.
//!
//! # Invariants
//! - Services borrow one `Connection`; repositories are rebuilt per call over
//!   the active transaction.
//! - A failed call leaves no partial rows behind.

pub mod access;
pub mod auth_service;
mod cascade;
pub mod error;
pub mod member_service;
mod provision;
pub mod project_service;
pub mod task_service;
pub mod user_service;
pub mod workspace_service;

use crate::repo::member_repo::SqliteMemberRepository;
use crate::repo::project_repo::SqliteProjectRepository;
use crate::repo::task_repo::SqliteTaskRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::workspace_repo::SqliteWorkspaceRepository;
use error::CoreResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Repository bundle bound to one connection or transaction.
pub(crate) struct Store<'conn> {
    pub users: SqliteUserRepository<'conn>,
    pub workspaces: SqliteWorkspaceRepository<'conn>,
    pub members: SqliteMemberRepository<'conn>,
    pub projects: SqliteProjectRepository<'conn>,
    pub tasks: SqliteTaskRepository<'conn>,
}

impl<'conn> Store<'conn> {
    pub fn open(conn: &'conn Connection) -> CoreResult<Self> {
        Ok(Self {
            users: SqliteUserRepository::try_new(conn)?,
            workspaces: SqliteWorkspaceRepository::try_new(conn)?,
            members: SqliteMemberRepository::try_new(conn)?,
            projects: SqliteProjectRepository::try_new(conn)?,
            tasks: SqliteTaskRepository::try_new(conn)?,
        })
    }
}

/// Runs `f` inside one IMMEDIATE transaction.
///
/// Commits when `f` returns `Ok`; any error drops the transaction, which
/// rolls back every write made through it.
pub(crate) fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Store<'_>) -> CoreResult<T>,
) -> CoreResult<T> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = {
        let store = Store::open(&tx)?;
        f(&store)?
    };
    tx.commit()?;
    Ok(value)
}
