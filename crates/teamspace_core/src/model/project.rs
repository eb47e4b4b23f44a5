//! Project model.

use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProjectId = Uuid;

/// Emoji assigned when the creator does not pick one.
pub const DEFAULT_PROJECT_EMOJI: &str = "📊";

/// Container of tasks inside exactly one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub emoji: String,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}
