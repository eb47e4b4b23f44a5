use rusqlite::Connection;
use teamspace_core::db::migrations::latest_version;
use teamspace_core::db::{open_db, open_db_in_memory, DbError};
use teamspace_core::repo::user_repo::SqliteUserRepository;
use teamspace_core::{permissions_for, RepoError, Role};

const TABLES: [&str; 7] = [
    "users",
    "accounts",
    "roles",
    "workspaces",
    "members",
    "projects",
    "tasks",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn reopening_keeps_schema_and_role_rows_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("teamspace.db");

    let first = open_db(&path).unwrap();
    let owner_id_before = role_id(&first, "OWNER");
    drop(first);

    let second = open_db(&path).unwrap();
    assert_eq!(schema_version(&second), latest_version());
    assert_eq!(role_count(&second), 3);
    assert_eq!(role_id(&second, "OWNER"), owner_id_before);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn seeded_roles_mirror_the_permission_registry() {
    let conn = open_db_in_memory().unwrap();

    for role in Role::ALL {
        let stored: String = conn
            .query_row(
                "SELECT permissions FROM roles WHERE name = ?1;",
                [role.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        let expected: Vec<&str> = permissions_for(role)
            .iter()
            .map(|permission| permission.as_str())
            .collect();
        assert_eq!(stored.split(',').collect::<Vec<_>>(), expected);
    }
    assert_eq!(
        role_permission_count(&conn, "OWNER"),
        14,
        "owner must hold every permission"
    );
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let raw = Connection::open_in_memory().unwrap();

    match SqliteUserRepository::try_new(&raw) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        }) => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("unmigrated connection must be rejected"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn role_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM roles;", [], |row| row.get(0))
        .unwrap()
}

fn role_id(conn: &Connection, name: &str) -> String {
    conn.query_row("SELECT id FROM roles WHERE name = ?1;", [name], |row| {
        row.get(0)
    })
    .unwrap()
}

fn role_permission_count(conn: &Connection, name: &str) -> usize {
    let stored: String = conn
        .query_row(
            "SELECT permissions FROM roles WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .unwrap();
    stored.split(',').count()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
