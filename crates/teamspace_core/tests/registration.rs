use rusqlite::Connection;
use teamspace_core::db::open_db_in_memory;
use teamspace_core::{
    AuthProvider, AuthService, CoreError, CredentialVerifier, ErrorKind, OAuthProfile,
    RegisterInput, Role, UserService, WorkspaceService,
};

struct PlainVerifier;

impl CredentialVerifier for PlainVerifier {
    fn verify(&self, password: &str, password_hash: &str) -> bool {
        password_hash == format!("hashed:{password}")
    }
}

fn input(email: &str, name: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_string(),
        name: name.to_string(),
        password_hash: "hashed:secret".to_string(),
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn register_provisions_default_workspace_with_owner_membership() {
    let conn = open_db_in_memory().unwrap();
    let registered = AuthService::new(&conn)
        .register(&input("a@x.com", "Ada"))
        .unwrap();

    assert_eq!(registered.workspace.name, "My Workspace");
    assert_eq!(
        registered.workspace.description.as_deref(),
        Some("Workspace created for Ada")
    );
    assert_eq!(registered.workspace.owner, registered.user.id);
    assert_eq!(registered.workspace.invite_code.len(), 8);
    assert_eq!(
        registered.user.current_workspace,
        Some(registered.workspace.id)
    );
    assert_eq!(registered.user.password_hash, None);

    let details = WorkspaceService::new(&conn)
        .get_workspace(registered.user.id, registered.workspace.id)
        .unwrap();
    assert_eq!(details.members.len(), 1);
    assert_eq!(details.members[0].member.role, Role::Owner);

    let (provider, provider_id): (String, String) = conn
        .query_row(
            "SELECT provider, provider_id FROM accounts WHERE user_id = ?1;",
            [registered.user.id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(provider, "EMAIL");
    assert_eq!(provider_id, "a@x.com");
}

#[test]
fn duplicate_email_is_rejected_without_writes() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(&conn);
    auth.register(&input("a@x.com", "Ada")).unwrap();

    let err = auth.register(&input("a@x.com", "Other")).unwrap_err();
    assert!(matches!(err, CoreError::EmailAlreadyExists));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(count(&conn, "users"), 1);
    assert_eq!(count(&conn, "accounts"), 1);
    assert_eq!(count(&conn, "workspaces"), 1);
    assert_eq!(count(&conn, "members"), 1);
}

#[test]
fn missing_owner_role_rolls_back_the_whole_registration() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("DELETE FROM roles WHERE name = 'OWNER';", [])
        .unwrap();

    let err = AuthService::new(&conn)
        .register(&input("a@x.com", "Ada"))
        .unwrap_err();
    assert!(matches!(err, CoreError::RoleNotFound(Role::Owner)));
    assert_eq!(err.kind(), ErrorKind::Configuration);

    for table in ["users", "accounts", "workspaces", "members"] {
        assert_eq!(count(&conn, table), 0, "{table} must stay empty");
    }
}

#[test]
fn oauth_creates_user_once_then_logs_in() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(&conn);
    let profile = OAuthProfile {
        provider: AuthProvider::Google,
        provider_id: "g-123".to_string(),
        display_name: "Grace".to_string(),
        email: Some("g@x.com".to_string()),
        picture: Some("https://img.example/g.png".to_string()),
    };

    let first = auth.login_or_create_oauth(&profile).unwrap();
    assert!(first.created);
    assert!(first.user.current_workspace.is_some());
    assert_eq!(
        first.user.profile_picture.as_deref(),
        Some("https://img.example/g.png")
    );

    let second = auth.login_or_create_oauth(&profile).unwrap();
    assert!(!second.created);
    assert_eq!(second.user.id, first.user.id);
    assert_eq!(count(&conn, "users"), 1);
    assert_eq!(count(&conn, "workspaces"), 1);
}

#[test]
fn oauth_with_known_email_does_not_link_provider() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(&conn);
    let registered = auth.register(&input("a@x.com", "Ada")).unwrap();

    let login = auth
        .login_or_create_oauth(&OAuthProfile {
            provider: AuthProvider::Github,
            provider_id: "gh-9".to_string(),
            display_name: "ada-gh".to_string(),
            email: Some("a@x.com".to_string()),
            picture: None,
        })
        .unwrap();

    assert!(!login.created);
    assert_eq!(login.user.id, registered.user.id);
    let github_accounts: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM accounts WHERE provider = 'GITHUB';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(github_accounts, 0);
    assert_eq!(count(&conn, "workspaces"), 1);
}

#[test]
fn oauth_without_email_still_creates_user() {
    let conn = open_db_in_memory().unwrap();
    let login = AuthService::new(&conn)
        .login_or_create_oauth(&OAuthProfile {
            provider: AuthProvider::Facebook,
            provider_id: "fb-1".to_string(),
            display_name: "Anon".to_string(),
            email: None,
            picture: None,
        })
        .unwrap();

    assert!(login.created);
    assert_eq!(login.user.email, None);
}

#[test]
fn verify_credentials_accepts_only_matching_password() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(&conn);
    let registered = auth.register(&input("a@x.com", "Ada")).unwrap();

    let user = auth
        .verify_credentials("a@x.com", "secret", &PlainVerifier)
        .unwrap();
    assert_eq!(user.id, registered.user.id);
    assert_eq!(user.password_hash, None);

    let wrong = auth
        .verify_credentials("a@x.com", "guess", &PlainVerifier)
        .unwrap_err();
    assert_eq!(wrong.kind(), ErrorKind::Unauthorized);

    let unknown = auth
        .verify_credentials("nobody@x.com", "secret", &PlainVerifier)
        .unwrap_err();
    assert!(matches!(unknown, CoreError::InvalidCredentials));
}

#[test]
fn refresh_token_rotation_updates_only_the_account() {
    let conn = open_db_in_memory().unwrap();
    let auth = AuthService::new(&conn);
    auth.register(&input("a@x.com", "Ada")).unwrap();

    auth.rotate_refresh_token(AuthProvider::Email, "a@x.com", Some("rt-1"), Some(42))
        .unwrap();
    let (token, expiry): (Option<String>, Option<i64>) = conn
        .query_row(
            "SELECT refresh_token, token_expiry FROM accounts WHERE provider_id = 'a@x.com';",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(token.as_deref(), Some("rt-1"));
    assert_eq!(expiry, Some(42));

    let err = auth
        .rotate_refresh_token(AuthProvider::Google, "missing", None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn current_user_snapshot_never_exposes_the_hash() {
    let conn = open_db_in_memory().unwrap();
    let registered = AuthService::new(&conn)
        .register(&input("a@x.com", "Ada"))
        .unwrap();

    let current = UserService::new(&conn)
        .current_user(registered.user.id)
        .unwrap();
    assert_eq!(
        current.current_workspace.as_ref().map(|workspace| workspace.id),
        Some(registered.workspace.id)
    );

    let json = serde_json::to_value(&current).unwrap();
    assert!(json["user"].get("password_hash").is_none());
    assert_eq!(json["user"]["email"], "a@x.com");
    assert_eq!(json["current_workspace"]["name"], "My Workspace");
}
