//! Domain model for the multi-tenant project-management core.
//!
//! # Responsibility
//! - Define the entities persisted by the core and their closed enumerations.
//! - Host the process-wide role/permission registry.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID v4.
//! - Timestamps are Unix epoch milliseconds.
//! - A `Member` always carries exactly one `Role`.

pub mod project;
pub mod role;
pub mod task;
pub mod user;
pub mod workspace;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
