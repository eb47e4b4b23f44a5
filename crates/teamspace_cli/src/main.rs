//! Operator entry point.
//!
//! # Responsibility
//! - Bootstrap the core against a database (migrate + seed roles).
//! - Print version, schema version and the role permission catalog.
//!
//! Usage: `teamspace [DB_PATH]`. Without an argument the path comes from
//! `TEAMSPACE_DB_PATH`.

use std::process::ExitCode;
use teamspace_core::db::migrations::current_user_version;
use teamspace_core::{bootstrap, core_version, permissions_for, CoreConfig, Role};

fn main() -> ExitCode {
    let mut config = CoreConfig::from_env();
    if let Some(path) = std::env::args().nth(1) {
        config.db_path = path.into();
    }

    let conn = match bootstrap(&config) {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("event=cli_bootstrap module=cli status=error");
            eprintln!("teamspace: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("teamspace_core version={}", core_version());
    println!("db path={}", config.db_path.display());
    match current_user_version(&conn) {
        Ok(version) => println!("schema version={version}"),
        Err(err) => {
            eprintln!("teamspace: {err}");
            return ExitCode::FAILURE;
        }
    }

    for role in Role::ALL {
        let permissions = permissions_for(role)
            .iter()
            .map(|permission| permission.as_str())
            .collect::<Vec<_>>()
            .join(",");
        println!("role {role}: {permissions}");
    }
    ExitCode::SUCCESS
}
