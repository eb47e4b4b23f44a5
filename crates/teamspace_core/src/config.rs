//! Runtime configuration and process bootstrap.
//!
//! Reads `TEAMSPACE_DB_PATH`, `TEAMSPACE_LOG_LEVEL` and `TEAMSPACE_LOG_DIR`.

use crate::db::{open_db, DbError};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TEAMSPACE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TEAMSPACE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TEAMSPACE_LOG_DIR";
pub const DEFAULT_DB_FILE: &str = "teamspace.sqlite3";

/// Settings needed to bring the core up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Builds a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV).map(PathBuf::from).unwrap_or(defaults.db_path),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

#[derive(Debug)]
pub enum BootstrapError {
    Logging(String),
    Db(DbError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
            Self::Db(err) => write!(f, "database open failed: {err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for BootstrapError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Starts logging (when configured) and opens the migrated, seeded database.
pub fn bootstrap(config: &CoreConfig) -> Result<Connection, BootstrapError> {
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())
            .map_err(BootstrapError::Logging)?;
    }
    Ok(open_db(&config.db_path)?)
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, DB_PATH_ENV, DEFAULT_DB_FILE, LOG_DIR_ENV, LOG_LEVEL_ENV};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn config_from(pairs: &[(&str, &str)]) -> CoreConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_FILE));
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn reads_every_variable_and_ignores_blanks() {
        let config = config_from(&[
            (DB_PATH_ENV, "/var/lib/teamspace/db.sqlite3"),
            (LOG_LEVEL_ENV, "warn"),
            (LOG_DIR_ENV, "  "),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/teamspace/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }
}
