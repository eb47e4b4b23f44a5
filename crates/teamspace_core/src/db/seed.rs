//! Role catalog seeding.
//!
//! Role rows are seed data: one row per `Role`, permissions mirrored from the
//! in-code registry. Memberships reference these rows by id.

use super::DbResult;
use crate::model::role::{permissions_for, Role};
use log::info;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Upserts one `roles` row per known role.
///
/// Existing rows keep their id; only the mirrored permission list is refreshed.
pub fn seed_roles(conn: &Connection) -> DbResult<()> {
    for role in Role::ALL {
        let permissions = permissions_for(role)
            .iter()
            .map(|permission| permission.as_str())
            .collect::<Vec<_>>()
            .join(",");
        conn.execute(
            "INSERT INTO roles (id, name, permissions)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET permissions = excluded.permissions;",
            params![Uuid::new_v4().to_string(), role.as_str(), permissions],
        )?;
    }
    info!(
        "event=roles_seed module=db status=ok count={}",
        Role::ALL.len()
    );
    Ok(())
}
