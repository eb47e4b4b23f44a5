//! Workspace and role-catalog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist workspaces and resolve them by id or invite code.
//! - Resolve seeded role rows for membership writes.
//!
//! # Invariants
//! - `invite_code` is globally unique; replacing it drops the old code at once.
//! - Workspace rows are deleted only after every scoped child row is gone.

use crate::model::role::Role;
use crate::model::user::UserId;
use crate::model::workspace::{Workspace, WorkspaceId};
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

const WORKSPACE_SELECT_SQL: &str = "SELECT
    w.id AS id,
    w.name AS name,
    w.description AS description,
    w.owner_id AS owner_id,
    w.invite_code AS invite_code,
    w.created_at AS created_at,
    w.updated_at AS updated_at
FROM workspaces w";

/// Stable id of one seeded `roles` row.
pub type RoleId = Uuid;

/// Seeded role row as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRecord {
    pub id: RoleId,
    pub role: Role,
}

/// Repository interface for workspaces and the role catalog.
pub trait WorkspaceRepository {
    fn create_workspace(
        &self,
        name: &str,
        description: Option<&str>,
        owner: UserId,
        invite_code: &str,
    ) -> RepoResult<Workspace>;
    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>>;
    fn find_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Workspace>>;
    /// Lists workspaces in which `user_id` holds a membership.
    fn list_for_member(&self, user_id: UserId) -> RepoResult<Vec<Workspace>>;
    fn update_workspace(
        &self,
        id: WorkspaceId,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<()>;
    fn set_invite_code(&self, id: WorkspaceId, invite_code: &str) -> RepoResult<()>;
    /// Deletes the workspace row only. Returns whether a row was removed.
    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<bool>;
    /// Looks up the seeded row for `role`.
    fn find_role(&self, role: Role) -> RepoResult<Option<RoleRecord>>;
    /// Lists all seeded roles ordered by name.
    fn list_roles(&self) -> RepoResult<Vec<RoleRecord>>;
}

/// SQLite-backed workspace repository.
pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_workspaces(&self, sql: &str, value: &str) -> RepoResult<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([value])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_workspace_row(row)?);
        }
        Ok(items)
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn create_workspace(
        &self,
        name: &str,
        description: Option<&str>,
        owner: UserId,
        invite_code: &str,
    ) -> RepoResult<Workspace> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO workspaces (id, name, description, owner_id, invite_code)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                name,
                description,
                owner.to_string(),
                invite_code
            ],
        )?;
        self.get_workspace(id)?.ok_or(RepoError::NotFound {
            entity: "workspace",
            id,
        })
    }

    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        let sql = format!("{WORKSPACE_SELECT_SQL} WHERE w.id = ?1;");
        Ok(self.query_workspaces(&sql, &id.to_string())?.pop())
    }

    fn find_by_invite_code(&self, invite_code: &str) -> RepoResult<Option<Workspace>> {
        let sql = format!("{WORKSPACE_SELECT_SQL} WHERE w.invite_code = ?1;");
        Ok(self.query_workspaces(&sql, invite_code)?.pop())
    }

    fn list_for_member(&self, user_id: UserId) -> RepoResult<Vec<Workspace>> {
        let sql = format!(
            "{WORKSPACE_SELECT_SQL}
             INNER JOIN members m ON m.workspace_id = w.id
             WHERE m.user_id = ?1
             ORDER BY m.joined_at ASC, w.id ASC;"
        );
        self.query_workspaces(&sql, &user_id.to_string())
    }

    fn update_workspace(
        &self,
        id: WorkspaceId,
        name: &str,
        description: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE workspaces
             SET name = ?2,
                 description = ?3,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![id.to_string(), name, description],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "workspace",
                id,
            });
        }
        Ok(())
    }

    fn set_invite_code(&self, id: WorkspaceId, invite_code: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE workspaces
             SET invite_code = ?2,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![id.to_string(), invite_code],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "workspace",
                id,
            });
        }
        Ok(())
    }

    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM workspaces WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn find_role(&self, role: Role) -> RepoResult<Option<RoleRecord>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM roles WHERE name = ?1;",
                [role.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        id.map(|id| {
            Ok(RoleRecord {
                id: parse_uuid(&id, "roles.id")?,
                role,
            })
        })
        .transpose()
    }

    fn list_roles(&self) -> RepoResult<Vec<RoleRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM roles ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut roles = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let role = Role::parse(&name).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid role `{name}` in roles.name"))
            })?;
            roles.push(RoleRecord {
                id: parse_uuid(&id, "roles.id")?,
                role,
            });
        }
        Ok(roles)
    }
}

fn parse_workspace_row(row: &Row<'_>) -> RepoResult<Workspace> {
    let id: String = row.get("id")?;
    let owner: String = row.get("owner_id")?;
    Ok(Workspace {
        id: parse_uuid(&id, "workspaces.id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        owner: parse_uuid(&owner, "workspaces.owner_id")?,
        invite_code: row.get("invite_code")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
