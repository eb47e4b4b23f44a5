//! Task repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Every task row carries both its project and that project's workspace.
//! - Listing is newest first: `created_at DESC, rowid DESC`, so rows
//!   written within the same millisecond keep reverse insertion order.

use crate::model::now_epoch_ms;
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskAnalytics, TaskId, TaskPriority, TaskStatus};
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::repo::{ensure_schema_ready, parse_optional_uuid, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    workspace_id,
    project_id,
    title,
    description,
    status,
    priority,
    assigned_to,
    created_by,
    due_date,
    created_at,
    updated_at
FROM tasks";

/// Insert model for a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask<'a> {
    pub workspace_id: WorkspaceId,
    pub project_id: ProjectId,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserId>,
    pub created_by: UserId,
    pub due_date: Option<i64>,
}

/// Query options for listing tasks of one workspace.
///
/// Empty filter vectors mean "no constraint".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    pub workspace_id: WorkspaceId,
    pub project_id: Option<ProjectId>,
    pub statuses: Vec<TaskStatus>,
    pub priorities: Vec<TaskPriority>,
    pub assignees: Vec<UserId>,
    /// Case-insensitive substring match on title.
    pub keyword: Option<String>,
    /// Exact due date match in epoch milliseconds.
    pub due_date: Option<i64>,
}

impl TaskListQuery {
    pub fn for_workspace(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            project_id: None,
            statuses: Vec::new(),
            priorities: Vec::new(),
            assignees: Vec::new(),
            keyword: None,
            due_date: None,
        }
    }
}

/// Scope of a task analytics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsScope {
    Workspace(WorkspaceId),
    Project(ProjectId),
}

/// Repository interface for tasks.
pub trait TaskRepository {
    fn create_task(&self, task: &NewTask<'_>) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Writes every mutable column of `task`.
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Deletes one task scoped to `workspace_id`. Returns whether a row was removed.
    fn delete_task(&self, id: TaskId, workspace_id: WorkspaceId) -> RepoResult<bool>;
    fn delete_tasks_of_project(&self, project_id: ProjectId) -> RepoResult<usize>;
    fn delete_tasks_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize>;
    /// Counts total, overdue (due before `now_ms`, not done) and done tasks.
    fn analytics(&self, scope: AnalyticsScope, now_ms: i64) -> RepoResult<TaskAnalytics>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &NewTask<'_>) -> RepoResult<Task> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO tasks (
                id,
                workspace_id,
                project_id,
                title,
                description,
                status,
                priority,
                assigned_to,
                created_by,
                due_date,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11);",
            params![
                id.to_string(),
                task.workspace_id.to_string(),
                task.project_id.to_string(),
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.assigned_to.map(|value| value.to_string()),
                task.created_by.to_string(),
                task.due_date,
                now_epoch_ms(),
            ],
        )?;
        self.get_task(id)?
            .ok_or(RepoError::NotFound { entity: "task", id })
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2,
                 description = ?3,
                 status = ?4,
                 priority = ?5,
                 assigned_to = ?6,
                 due_date = ?7,
                 updated_at = (CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER))
             WHERE id = ?1;",
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.status.as_str(),
                task.priority.as_str(),
                task.assigned_to.map(|value| value.to_string()),
                task.due_date,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "task",
                id: task.id,
            });
        }
        Ok(())
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE workspace_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.workspace_id.to_string())];

        if let Some(project_id) = query.project_id {
            sql.push_str(" AND project_id = ?");
            bind_values.push(Value::Text(project_id.to_string()));
        }

        push_in_clause(
            &mut sql,
            &mut bind_values,
            "status",
            query.statuses.iter().map(|status| status.as_str().to_string()),
        );
        push_in_clause(
            &mut sql,
            &mut bind_values,
            "priority",
            query
                .priorities
                .iter()
                .map(|priority| priority.as_str().to_string()),
        );
        push_in_clause(
            &mut sql,
            &mut bind_values,
            "assigned_to",
            query.assignees.iter().map(|user_id| user_id.to_string()),
        );

        if let Some(keyword) = query.keyword.as_deref() {
            sql.push_str(" AND instr(lower(title), lower(?)) > 0");
            bind_values.push(Value::Text(keyword.to_string()));
        }

        if let Some(due_date) = query.due_date {
            sql.push_str(" AND due_date = ?");
            bind_values.push(Value::Integer(due_date));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId, workspace_id: WorkspaceId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND workspace_id = ?2;",
            [id.to_string(), workspace_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn delete_tasks_of_project(&self, project_id: ProjectId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM tasks WHERE project_id = ?1;",
            [project_id.to_string()],
        )?;
        Ok(removed)
    }

    fn delete_tasks_of_workspace(&self, workspace_id: WorkspaceId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM tasks WHERE workspace_id = ?1;",
            [workspace_id.to_string()],
        )?;
        Ok(removed)
    }

    fn analytics(&self, scope: AnalyticsScope, now_ms: i64) -> RepoResult<TaskAnalytics> {
        let (column, id) = match scope {
            AnalyticsScope::Workspace(id) => ("workspace_id", id),
            AnalyticsScope::Project(id) => ("project_id", id),
        };
        let (total, overdue, completed): (i64, i64, i64) = self.conn.query_row(
            &format!(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN due_date < ?2 AND status <> 'DONE' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'DONE' THEN 1 ELSE 0 END), 0)
                 FROM tasks
                 WHERE {column} = ?1;"
            ),
            params![id.to_string(), now_ms],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(TaskAnalytics {
            total_tasks: total.max(0) as u64,
            overdue_tasks: overdue.max(0) as u64,
            completed_tasks: completed.max(0) as u64,
        })
    }
}

fn push_in_clause(
    sql: &mut String,
    bind_values: &mut Vec<Value>,
    column: &'static str,
    values: impl Iterator<Item = String>,
) {
    let start = bind_values.len();
    bind_values.extend(values.map(Value::Text));
    let count = bind_values.len() - start;
    if count == 0 {
        return;
    }
    let placeholders = vec!["?"; count].join(", ");
    sql.push_str(&format!(" AND {column} IN ({placeholders})"));
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: String = row.get("id")?;
    let workspace_id: String = row.get("workspace_id")?;
    let project_id: String = row.get("project_id")?;
    let created_by: String = row.get("created_by")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;
    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid task priority `{priority_text}` in tasks.priority"
        ))
    })?;

    Ok(Task {
        id: parse_uuid(&id, "tasks.id")?,
        workspace_id: parse_uuid(&workspace_id, "tasks.workspace_id")?,
        project_id: parse_uuid(&project_id, "tasks.project_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        assigned_to: parse_optional_uuid(row.get("assigned_to")?, "tasks.assigned_to")?,
        created_by: parse_uuid(&created_by, "tasks.created_by")?,
        due_date: row.get("due_date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
