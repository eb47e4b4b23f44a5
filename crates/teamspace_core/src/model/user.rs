//! User and auth-provider account model.
//!
//! # Invariants
//! - `password_hash` is absent for OAuth-only users and never serialized.
//! - `current_workspace` is a weak reference; it never owns the workspace.
//! - `(provider, provider_id)` identifies at most one `Account`.

use crate::model::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type UserId = Uuid;
pub type AccountId = Uuid;

/// Registered person who can hold memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub name: String,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub current_workspace: Option<WorkspaceId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Returns a copy with the credential hash removed, for caller-facing
    /// snapshots.
    pub fn without_credential(mut self) -> Self {
        self.password_hash = None;
        self
    }
}

/// Identity provider backing an `Account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthProvider {
    Google,
    Github,
    Facebook,
    /// Local email/password login; `provider_id` is the email.
    Email,
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::Github => "GITHUB",
            Self::Facebook => "FACEBOOK",
            Self::Email => "EMAIL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GOOGLE" => Some(Self::Google),
            "GITHUB" => Some(Self::Github),
            "FACEBOOK" => Some(Self::Facebook),
            "EMAIL" => Some(Self::Email),
            _ => None,
        }
    }
}

impl Display for AuthProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding between a user and one provider identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub provider: AuthProvider,
    pub provider_id: String,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub token_expiry: Option<i64>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{AuthProvider, User};
    use uuid::Uuid;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("a@x.com".to_string()),
            name: "A".to_string(),
            profile_picture: None,
            password_hash: Some("hash".to_string()),
            current_workspace: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn credential_hash_is_never_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn without_credential_clears_hash() {
        assert_eq!(sample_user().without_credential().password_hash, None);
    }

    #[test]
    fn provider_tokens_parse_back() {
        for provider in [
            AuthProvider::Google,
            AuthProvider::Github,
            AuthProvider::Facebook,
            AuthProvider::Email,
        ] {
            assert_eq!(AuthProvider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(AuthProvider::parse("email"), None);
    }
}
