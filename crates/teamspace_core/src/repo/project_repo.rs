//! Project repository contracts and SQLite implementation.

use crate::model::now_epoch_ms;
use crate::model::project::{Project, ProjectId};
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::repo::{ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    name,
    description,
    emoji,
    created_by,
    created_at,
    updated_at
FROM projects";

/// Insert model for a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject<'a> {
    pub workspace_id: WorkspaceId,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub emoji: &'a str,
    pub created_by: UserId,
}

/// Repository interface for projects.
pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject<'_>) -> RepoResult<Project>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists projects of one workspace, newest first. Insertion order breaks
    /// timestamp ties.
    fn list_projects(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Project>>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    /// Deletes the project row only. Returns whether a row was removed.
    fn delete_project(&self, id: ProjectId) -> RepoResult<bool>;
    fn delete_projects_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject<'_>) -> RepoResult<Project> {
        let id = Uuid::new_v4();
        let now = now_epoch_ms();
        self.conn.execute(
            "INSERT INTO projects (
                id, workspace_id, name, description, emoji, created_by, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                project.workspace_id.to_string(),
                project.name,
                project.description,
                project.emoji,
                project.created_by.to_string(),
                now,
            ],
        )?;
        self.get_project(id)?.ok_or(RepoError::NotFound {
            entity: "project",
            id,
        })
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL}
             WHERE workspace_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([workspace_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_project_row(row)?);
        }
        Ok(items)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET name = ?2,
                 description = ?3,
                 emoji = ?4,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.description.as_deref(),
                project.emoji.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project",
                id: project.id,
            });
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn delete_projects_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM projects WHERE workspace_id = ?1;",
            [workspace_id.to_string()],
        )?;
        Ok(removed)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get("id")?;
    let workspace_id: String = row.get("workspace_id")?;
    let created_by: String = row.get("created_by")?;
    Ok(Project {
        id: parse_uuid(&id, "projects.id")?,
        workspace_id: parse_uuid(&workspace_id, "projects.workspace_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        emoji: row.get("emoji")?,
        created_by: parse_uuid(&created_by, "projects.created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
