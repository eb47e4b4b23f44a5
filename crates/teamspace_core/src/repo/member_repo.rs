//! Membership repository contracts and SQLite implementation.
//!
//! # Invariants
//! - At most one membership per `(user_id, workspace_id)`; enforced by a
//!   UNIQUE constraint, surfaced as `RepoError::UniqueViolation`.
//! - Every membership references a seeded role row.

use crate::model::role::Role;
use crate::model::user::UserId;
use crate::model::workspace::{Member, MemberId, WorkspaceId};
use crate::repo::workspace_repo::RoleId;
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use uuid::Uuid;

const MEMBER_SELECT_SQL: &str = "SELECT
    m.id AS id,
    m.user_id AS user_id,
    m.workspace_id AS workspace_id,
    r.name AS role_name,
    m.joined_at AS joined_at
FROM members m
INNER JOIN roles r ON r.id = m.role_id";

/// Membership joined with the member's public user fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberProfile {
    pub member: Member,
    pub name: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

/// Repository interface for workspace memberships.
pub trait MemberRepository {
    fn create_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        role_id: RoleId,
        joined_at: i64,
    ) -> RepoResult<Member>;
    fn find_member(&self, user_id: UserId, workspace_id: WorkspaceId)
        -> RepoResult<Option<Member>>;
    fn list_members(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<MemberProfile>>;
    fn set_member_role(&self, member_id: MemberId, role_id: RoleId) -> RepoResult<()>;
    /// Returns the earliest-joined workspace `user_id` still belongs to.
    fn first_workspace_of(&self, user_id: UserId) -> RepoResult<Option<WorkspaceId>>;
    /// Deletes every membership of `workspace_id`. Returns removed row count.
    fn delete_members_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize>;
}

/// SQLite-backed membership repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn create_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
        role_id: RoleId,
        joined_at: i64,
    ) -> RepoResult<Member> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO members (id, user_id, workspace_id, role_id, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                user_id.to_string(),
                workspace_id.to_string(),
                role_id.to_string(),
                joined_at
            ],
        )?;
        self.find_member(user_id, workspace_id)?
            .ok_or(RepoError::NotFound {
                entity: "member",
                id,
            })
    }

    fn find_member(
        &self,
        user_id: UserId,
        workspace_id: WorkspaceId,
    ) -> RepoResult<Option<Member>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL} WHERE m.user_id = ?1 AND m.workspace_id = ?2;"
        ))?;
        let mut rows = stmt.query([user_id.to_string(), workspace_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_member_row(row)?));
        }
        Ok(None)
    }

    fn list_members(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<MemberProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.id AS id,
                m.user_id AS user_id,
                m.workspace_id AS workspace_id,
                r.name AS role_name,
                m.joined_at AS joined_at,
                u.name AS user_name,
                u.email AS user_email,
                u.profile_picture AS user_picture
             FROM members m
             INNER JOIN roles r ON r.id = m.role_id
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.workspace_id = ?1
             ORDER BY m.joined_at ASC, m.id ASC;",
        )?;
        let mut rows = stmt.query([workspace_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(MemberProfile {
                member: parse_member_row(row)?,
                name: row.get("user_name")?,
                email: row.get("user_email")?,
                profile_picture: row.get("user_picture")?,
            });
        }
        Ok(items)
    }

    fn set_member_role(&self, member_id: MemberId, role_id: RoleId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members SET role_id = ?2 WHERE id = ?1;",
            params![member_id.to_string(), role_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "member",
                id: member_id,
            });
        }
        Ok(())
    }

    fn first_workspace_of(&self, user_id: UserId) -> RepoResult<Option<WorkspaceId>> {
        let mut stmt = self.conn.prepare(
            "SELECT workspace_id
             FROM members
             WHERE user_id = ?1
             ORDER BY joined_at ASC, id ASC
             LIMIT 1;",
        )?;
        let mut rows = stmt.query([user_id.to_string()])?;
        if let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            return Ok(Some(parse_uuid(&value, "members.workspace_id")?));
        }
        Ok(None)
    }

    fn delete_members_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM members WHERE workspace_id = ?1;",
            [workspace_id.to_string()],
        )?;
        Ok(removed)
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let workspace_id: String = row.get("workspace_id")?;
    let role_name: String = row.get("role_name")?;
    let role = Role::parse(&role_name).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_name}` in roles.name"))
    })?;

    Ok(Member {
        id: parse_uuid(&id, "members.id")?,
        user_id: parse_uuid(&user_id, "members.user_id")?,
        workspace_id: parse_uuid(&workspace_id, "members.workspace_id")?,
        role,
        joined_at: row.get("joined_at")?,
    })
}
