use rusqlite::Connection;
use teamspace_core::db::open_db_in_memory;
use teamspace_core::repo::member_repo::SqliteMemberRepository;
use teamspace_core::repo::workspace_repo::SqliteWorkspaceRepository;
use teamspace_core::{
    authorize, resolve_role, AuthService, CoreError, ErrorKind, MemberService, Permission,
    ProjectInput, ProjectService, RegisterInput, RegisteredUser, Role, WorkspaceService,
};
use uuid::Uuid;

fn register(conn: &Connection, email: &str) -> RegisteredUser {
    AuthService::new(conn)
        .register(&RegisterInput {
            email: email.to_string(),
            name: "someone".to_string(),
            password_hash: "hashed".to_string(),
        })
        .unwrap()
}

fn has_member_row(conn: &Connection, user: Uuid, workspace: Uuid) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM members WHERE user_id = ?1 AND workspace_id = ?2);",
        [user.to_string(), workspace.to_string()],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        == 1
}

#[test]
fn resolve_role_succeeds_exactly_when_membership_exists() {
    let conn = open_db_in_memory().unwrap();
    let users: Vec<RegisteredUser> = ["a@x.com", "b@x.com", "c@x.com"]
        .iter()
        .map(|email| register(&conn, email))
        .collect();
    MemberService::new(&conn)
        .join_workspace(users[1].user.id, &users[0].workspace.invite_code)
        .unwrap();
    MemberService::new(&conn)
        .join_workspace(users[2].user.id, &users[1].workspace.invite_code)
        .unwrap();

    let workspaces = SqliteWorkspaceRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    for user in &users {
        for host in &users {
            let resolved = resolve_role(&workspaces, &members, user.user.id, host.workspace.id);
            let expected = has_member_row(&conn, user.user.id, host.workspace.id);
            assert_eq!(resolved.is_ok(), expected);
            if let Err(err) = resolved {
                assert!(matches!(err, CoreError::NotAMember { .. }));
                assert_eq!(err.kind(), ErrorKind::Forbidden);
            }
        }
    }
}

#[test]
fn resolve_role_reports_owner_member_and_unknown_workspace() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    MemberService::new(&conn)
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();

    let workspaces = SqliteWorkspaceRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    assert_eq!(
        resolve_role(&workspaces, &members, host.user.id, host.workspace.id).unwrap(),
        Role::Owner
    );
    assert_eq!(
        resolve_role(&workspaces, &members, guest.user.id, host.workspace.id).unwrap(),
        Role::Member
    );

    let missing = Uuid::new_v4();
    let err = resolve_role(&workspaces, &members, host.user.id, missing).unwrap_err();
    assert!(matches!(err, CoreError::WorkspaceNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn authorize_checks_the_resolved_role() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    MemberService::new(&conn)
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();

    let workspaces = SqliteWorkspaceRepository::try_new(&conn).unwrap();
    let members = SqliteMemberRepository::try_new(&conn).unwrap();
    let role = authorize(
        &workspaces,
        &members,
        guest.user.id,
        host.workspace.id,
        &[Permission::CreateTask],
    )
    .unwrap();
    assert_eq!(role, Role::Member);

    let err = authorize(
        &workspaces,
        &members,
        guest.user.id,
        host.workspace.id,
        &[Permission::DeleteProject],
    )
    .unwrap_err();
    assert!(matches!(err, CoreError::MissingPermission { role: Role::Member, .. }));
}

#[test]
fn denied_operations_leave_state_untouched() {
    let conn = open_db_in_memory().unwrap();
    let host = register(&conn, "host@x.com");
    let guest = register(&conn, "guest@x.com");
    let outsider = register(&conn, "outsider@x.com");
    MemberService::new(&conn)
        .join_workspace(guest.user.id, &host.workspace.invite_code)
        .unwrap();

    let projects = ProjectService::new(&conn);
    let project = projects
        .create_project(
            host.user.id,
            host.workspace.id,
            &ProjectInput {
                name: "Roadmap".to_string(),
                ..ProjectInput::default()
            },
        )
        .unwrap();

    let err = projects
        .delete_project(guest.user.id, host.workspace.id, project.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = projects
        .list_projects(outsider.user.id, host.workspace.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAMember { .. }));

    let err = WorkspaceService::new(&conn)
        .update_workspace(
            guest.user.id,
            host.workspace.id,
            &teamspace_core::WorkspaceInput {
                name: "hijacked".to_string(),
                description: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let remaining = projects
        .list_projects(host.user.id, host.workspace.id)
        .unwrap();
    assert_eq!(remaining, vec![project]);
    let details = WorkspaceService::new(&conn)
        .get_workspace(host.user.id, host.workspace.id)
        .unwrap();
    assert_eq!(details.workspace.name, "My Workspace");
}
