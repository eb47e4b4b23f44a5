//! Registration, OAuth sign-in and credential checks.
//!
//! # Responsibility
//! - Create a user together with its account, default workspace and owner
//!   membership as one atomic unit.
//! - Resolve OAuth identities to users without re-linking providers.
//!
//! # Invariants
//! - A failed registration leaves no user, account, workspace or membership.
//! - Password hashing and token issuance stay outside this crate.
//! - Returned users never carry a credential hash.

use crate::model::user::{AuthProvider, User, UserId};
use crate::model::workspace::{default_workspace_description, Workspace, DEFAULT_WORKSPACE_NAME};
use crate::repo::user_repo::{NewUser, SqliteUserRepository, UserRepository};
use crate::service::error::{CoreError, CoreResult};
use crate::service::provision::provision_workspace;
use crate::service::{in_transaction, Store};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::time::Instant;

/// Checks a plaintext password against a stored hash.
///
/// Implemented by the embedding application with its hashing scheme.
pub trait CredentialVerifier {
    fn verify(&self, password: &str, password_hash: &str) -> bool;
}

/// Local sign-up input. `password_hash` is already hashed by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInput {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredUser {
    pub user: User,
    pub workspace: Workspace,
}

/// Identity asserted by an external OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub picture: Option<String>,
}

/// Result of an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthLogin {
    pub user: User,
    /// Whether this call created the user.
    pub created: bool,
}

/// Authentication use-case service.
pub struct AuthService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> AuthService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers a local user and provisions their default workspace.
    ///
    /// # Errors
    /// - `EmailAlreadyExists` when the email is taken, including when a
    ///   concurrent registration wins the race.
    /// - `RoleNotFound` when the role catalog is missing OWNER.
    pub fn register(&self, input: &RegisterInput) -> CoreResult<RegisteredUser> {
        let started_at = Instant::now();
        info!("event=user_register module=auth status=start");
        let result = in_transaction(self.conn, |store| {
            if store.users.find_user_by_email(&input.email)?.is_some() {
                return Err(CoreError::EmailAlreadyExists);
            }

            let user = store
                .users
                .create_user(&NewUser {
                    email: Some(input.email.clone()),
                    name: input.name.clone(),
                    profile_picture: None,
                    password_hash: Some(input.password_hash.clone()),
                })
                .map_err(|err| {
                    if err.is_unique_violation_on("users") {
                        CoreError::EmailAlreadyExists
                    } else {
                        err.into()
                    }
                })?;
            store
                .users
                .create_account(user.id, AuthProvider::Email, &input.email)
                .map_err(|err| {
                    if err.is_unique_violation_on("accounts") {
                        CoreError::EmailAlreadyExists
                    } else {
                        err.into()
                    }
                })?;

            let description = default_workspace_description(&input.name);
            let (workspace, _) =
                provision_workspace(store, user.id, DEFAULT_WORKSPACE_NAME, Some(&description))?;
            let user = reload_user(store, user.id)?;
            Ok(RegisteredUser { user, workspace })
        });

        match &result {
            Ok(registered) => info!(
                "event=user_register module=auth status=ok user_id={} workspace_id={} duration_ms={}",
                registered.user.id,
                registered.workspace.id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=user_register module=auth status=error kind={} duration_ms={}",
                err.kind(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Resolves an OAuth identity to a user, creating one on first sight.
    ///
    /// An existing user matched by email is returned as-is; the new provider
    /// is not linked to it.
    pub fn login_or_create_oauth(&self, profile: &OAuthProfile) -> CoreResult<OAuthLogin> {
        let started_at = Instant::now();
        info!(
            "event=oauth_login module=auth status=start provider={}",
            profile.provider
        );
        let result = in_transaction(self.conn, |store| {
            if let Some(account) = store
                .users
                .find_account(profile.provider, &profile.provider_id)?
            {
                let user = reload_user(store, account.user_id)?;
                return Ok(OAuthLogin {
                    user,
                    created: false,
                });
            }

            if let Some(email) = profile.email.as_deref() {
                if let Some(existing) = store.users.find_user_by_email(email)? {
                    info!(
                        "event=oauth_login module=auth status=ok match=email linked=false provider={} user_id={}",
                        profile.provider, existing.id
                    );
                    return Ok(OAuthLogin {
                        user: existing.without_credential(),
                        created: false,
                    });
                }
            }

            let user = store.users.create_user(&NewUser {
                email: profile.email.clone(),
                name: profile.display_name.clone(),
                profile_picture: profile.picture.clone(),
                password_hash: None,
            })?;
            store
                .users
                .create_account(user.id, profile.provider, &profile.provider_id)?;
            let description = default_workspace_description(&profile.display_name);
            provision_workspace(store, user.id, DEFAULT_WORKSPACE_NAME, Some(&description))?;
            let user = reload_user(store, user.id)?;
            Ok(OAuthLogin {
                user,
                created: true,
            })
        });

        match &result {
            Ok(login) => info!(
                "event=oauth_login module=auth status=ok provider={} user_id={} created={} duration_ms={}",
                profile.provider,
                login.user.id,
                login.created,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=oauth_login module=auth status=error provider={} kind={} duration_ms={}",
                profile.provider,
                err.kind(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    /// Checks local credentials and returns the matching user.
    ///
    /// # Errors
    /// - `InvalidCredentials` when no local account exists, the user has no
    ///   password, or `verifier` rejects the password.
    /// - `UserNotFound` when the account outlived its user.
    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
        verifier: &dyn CredentialVerifier,
    ) -> CoreResult<User> {
        let users = SqliteUserRepository::try_new(self.conn)?;
        let account = users
            .find_account(AuthProvider::Email, email)?
            .ok_or(CoreError::InvalidCredentials)?;
        let user = users
            .get_user(account.user_id)?
            .ok_or(CoreError::UserNotFound(account.user_id))?;

        let accepted = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verifier.verify(password, hash));
        if !accepted {
            warn!(
                "event=credentials_verify module=auth status=error user_id={}",
                user.id
            );
            return Err(CoreError::InvalidCredentials);
        }
        Ok(user.without_credential())
    }

    /// Stores a new refresh token for one provider account.
    pub fn rotate_refresh_token(
        &self,
        provider: AuthProvider,
        provider_id: &str,
        refresh_token: Option<&str>,
        token_expiry: Option<i64>,
    ) -> CoreResult<()> {
        let users = SqliteUserRepository::try_new(self.conn)?;
        let account = users
            .find_account(provider, provider_id)?
            .ok_or(CoreError::AccountNotFound(provider))?;
        users.update_refresh_token(account.id, refresh_token, token_expiry)?;
        info!(
            "event=refresh_token_rotate module=auth status=ok provider={} account_id={}",
            provider, account.id
        );
        Ok(())
    }
}

fn reload_user(store: &Store<'_>, user_id: UserId) -> CoreResult<User> {
    store
        .users
        .get_user(user_id)?
        .map(User::without_credential)
        .ok_or(CoreError::UserNotFound(user_id))
}
