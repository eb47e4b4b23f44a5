//! User and account repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist users, their provider accounts and the current-workspace pointer.
//!
//! # Invariants
//! - `users.email` is unique when present.
//! - `(provider, provider_id)` is unique across accounts.
//! - Accounts are immutable except for refresh-token rotation.

use crate::model::user::{Account, AccountId, AuthProvider, User, UserId};
use crate::model::workspace::WorkspaceId;
use crate::repo::{ensure_schema_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    name,
    profile_picture,
    password_hash,
    current_workspace_id,
    created_at,
    updated_at
FROM users";

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    provider,
    provider_id,
    refresh_token,
    token_expiry,
    created_at
FROM accounts";

/// Insert model for a new user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub email: Option<String>,
    pub name: String,
    pub profile_picture: Option<String>,
    pub password_hash: Option<String>,
}

/// Repository interface for users and accounts.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Points `user_id` at `workspace_id`, or clears the pointer.
    fn set_current_workspace(
        &self,
        user_id: UserId,
        workspace_id: Option<WorkspaceId>,
    ) -> RepoResult<()>;
    /// Lists users whose current workspace is `workspace_id`.
    fn list_users_pointing_at(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<UserId>>;
    fn create_account(
        &self,
        user_id: UserId,
        provider: AuthProvider,
        provider_id: &str,
    ) -> RepoResult<Account>;
    fn find_account(&self, provider: AuthProvider, provider_id: &str)
        -> RepoResult<Option<Account>>;
    fn update_refresh_token(
        &self,
        account_id: AccountId,
        refresh_token: Option<&str>,
        token_expiry: Option<i64>,
    ) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO users (id, email, name, profile_picture, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                user.email.as_deref(),
                user.name.as_str(),
                user.profile_picture.as_deref(),
                user.password_hash.as_deref(),
            ],
        )?;
        self.get_user(id)?
            .ok_or(RepoError::NotFound { entity: "user", id })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        query_one_user(self.conn, "id", &id.to_string())
    }

    fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        query_one_user(self.conn, "email", email)
    }

    fn set_current_workspace(
        &self,
        user_id: UserId,
        workspace_id: Option<WorkspaceId>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET current_workspace_id = ?2,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![
                user_id.to_string(),
                workspace_id.map(|value| value.to_string())
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id: user_id,
            });
        }
        Ok(())
    }

    fn list_users_pointing_at(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM users
             WHERE current_workspace_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([workspace_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "users.id")?);
        }
        Ok(ids)
    }

    fn create_account(
        &self,
        user_id: UserId,
        provider: AuthProvider,
        provider_id: &str,
    ) -> RepoResult<Account> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO accounts (id, user_id, provider, provider_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                user_id.to_string(),
                provider.as_str(),
                provider_id
            ],
        )?;
        self.find_account(provider, provider_id)?
            .ok_or(RepoError::NotFound {
                entity: "account",
                id,
            })
    }

    fn find_account(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> RepoResult<Option<Account>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACCOUNT_SELECT_SQL} WHERE provider = ?1 AND provider_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![provider.as_str(), provider_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_account_row(row)?));
        }
        Ok(None)
    }

    fn update_refresh_token(
        &self,
        account_id: AccountId,
        refresh_token: Option<&str>,
        token_expiry: Option<i64>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE accounts
             SET refresh_token = ?2,
                 token_expiry = ?3
             WHERE id = ?1;",
            params![account_id.to_string(), refresh_token, token_expiry],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "account",
                id: account_id,
            });
        }
        Ok(())
    }
}

fn query_one_user(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> RepoResult<Option<User>> {
    let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([value])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_user_row(row)?));
    }
    Ok(None)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        profile_picture: row.get("profile_picture")?,
        password_hash: row.get("password_hash")?,
        current_workspace: parse_optional_uuid(
            row.get("current_workspace_id")?,
            "users.current_workspace_id",
        )?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let provider_text: String = row.get("provider")?;
    let provider = AuthProvider::parse(&provider_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid provider `{provider_text}` in accounts.provider"
        ))
    })?;

    Ok(Account {
        id: parse_uuid(&id, "accounts.id")?,
        user_id: parse_uuid(&user_id, "accounts.user_id")?,
        provider,
        provider_id: row.get("provider_id")?,
        refresh_token: row.get("refresh_token")?,
        token_expiry: row.get("token_expiry")?,
        created_at: row.get("created_at")?,
    })
}
