//! Workspace and membership model.
//!
//! # Invariants
//! - A workspace has exactly one owner, its creator.
//! - `invite_code` is 8 lowercase hex characters and globally unique.
//! - At most one `Member` exists per `(user_id, workspace_id)`.

use crate::model::role::Role;
use crate::model::user::UserId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkspaceId = Uuid;
pub type MemberId = Uuid;

/// Name given to the workspace auto-provisioned at sign-up.
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";
/// Length of generated invite codes.
pub const INVITE_CODE_LEN: usize = 8;

static INVITE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{8}$").expect("valid invite code regex"));

/// Tenant boundary: projects, tasks and memberships are scoped to one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub owner: UserId,
    pub invite_code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Join record granting a user one role inside one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub user_id: UserId,
    pub workspace_id: WorkspaceId,
    pub role: Role,
    pub joined_at: i64,
}

/// Generates a fresh invite code from a random UUID.
pub fn generate_invite_code() -> String {
    Uuid::new_v4().simple().to_string()[..INVITE_CODE_LEN].to_string()
}

/// Whether `value` has the shape of a generated invite code.
pub fn is_well_formed_invite_code(value: &str) -> bool {
    INVITE_CODE_RE.is_match(value)
}

/// Description stored on the workspace auto-provisioned for `user_name`.
pub fn default_workspace_description(user_name: &str) -> String {
    format!("Workspace created for {user_name}")
}

#[cfg(test)]
mod tests {
    use super::{generate_invite_code, is_well_formed_invite_code, INVITE_CODE_LEN};
    use std::collections::HashSet;

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..32 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(is_well_formed_invite_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn generated_codes_vary() {
        let codes: HashSet<String> = (0..64).map(|_| generate_invite_code()).collect();
        assert!(codes.len() > 60);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_well_formed_invite_code(""));
        assert!(!is_well_formed_invite_code("ABCDEF12"));
        assert!(!is_well_formed_invite_code("abc"));
        assert!(!is_well_formed_invite_code("abcdef123"));
        assert!(!is_well_formed_invite_code("abcdefg1"));
    }
}
