use rusqlite::Connection;
use teamspace_core::db::open_db_in_memory;
use teamspace_core::{
    AuthService, CoreError, ErrorKind, MemberService, RegisterInput, RegisteredUser, Role,
    WorkspaceService,
};

fn register(conn: &Connection, email: &str) -> RegisteredUser {
    AuthService::new(conn)
        .register(&RegisterInput {
            email: email.to_string(),
            name: "someone".to_string(),
            password_hash: "hashed".to_string(),
        })
        .unwrap()
}

fn membership_rows(conn: &Connection, user: &RegisteredUser, host: &RegisteredUser) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM members WHERE user_id = ?1 AND workspace_id = ?2;",
        [user.user.id.to_string(), host.workspace.id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn join_creates_member_role_membership() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");

    let member = MemberService::new(&conn)
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();

    assert_eq!(member.role, Role::Member);
    assert_eq!(member.workspace_id, host.workspace.id);
    assert!(member.joined_at > 0);
}

#[test]
fn joining_twice_is_rejected_and_leaves_one_row() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    let members = MemberService::new(&conn);

    members
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();
    let err = members
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap_err();

    assert!(matches!(err, CoreError::AlreadyMember { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(membership_rows(&conn, &guest, &host), 1);
}

#[test]
fn owner_joining_own_workspace_is_already_member() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");

    let err = MemberService::new(&conn)
        .join_workspace(host.user.id, &host.workspace.invite_code)
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyMember { .. }));
}

#[test]
fn unique_constraint_blocks_duplicate_membership_inserts() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");

    let role_id: String = conn
        .query_row("SELECT id FROM roles WHERE name = 'MEMBER';", [], |row| {
            row.get(0)
        })
        .unwrap();
    let result = conn.execute(
        "INSERT INTO members (id, user_id, workspace_id, role_id, joined_at)
         VALUES ('dup', ?1, ?2, ?3, 0);",
        [
            host.user.id.to_string(),
            host.workspace.id.to_string(),
            role_id,
        ],
    );
    assert!(result.is_err());
    assert_eq!(membership_rows(&conn, &host, &host), 1);
}

#[test]
fn unknown_and_malformed_codes_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    let members = MemberService::new(&conn);

    for code in ["00000000", "ABCDEF12", "short", "", "1234567890"] {
        let err = members.join_workspace(guest.user.id, code).unwrap_err();
        assert!(
            matches!(err, CoreError::InviteCodeNotFound),
            "code {code:?} gave {err:?}"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn regenerated_code_invalidates_the_old_one_immediately() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    let old_code = host.workspace.invite_code.clone();

    let refreshed = WorkspaceService::new(&conn)
        .regenerate_invite_code(host.user.id, host.workspace.id)
        .unwrap();
    assert_ne!(refreshed.invite_code, old_code);
    assert_eq!(refreshed.invite_code.len(), 8);

    let members = MemberService::new(&conn);
    let err = members.join_workspace(guest.user.id, &old_code).unwrap_err();
    assert!(matches!(err, CoreError::InviteCodeNotFound));

    members
        .join_workspace(guest.user.id, &refreshed.invite_code)
        .unwrap();
}

#[test]
fn plain_members_cannot_regenerate_codes() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    MemberService::new(&conn)
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();

    let err = WorkspaceService::new(&conn)
        .regenerate_invite_code(guest.user.id, host.workspace.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::MissingPermission { .. }));
}
