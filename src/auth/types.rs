use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Email shown for accounts whose provider did not report one.
pub const NO_EMAIL: &str = "No Email";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

/// Tokens returned by an identity provider after a successful sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSession {
    pub uid: String,
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

/// Proof of an authenticated session.
///
/// Only the auth gateway creates sessions, so holding one means a sign-in
/// actually succeeded.
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_provider(session: ProviderSession) -> Self {
        let email = session
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| NO_EMAIL.to_string());
        Self {
            user: User {
                uid: session.uid,
                email,
            },
            id_token: session.id_token,
            refresh_token: session.refresh_token,
            expires_at: Utc::now() + Duration::seconds(session.expires_in_secs),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn uid(&self) -> &str {
        &self.user.uid
    }

    /// Bearer token for remote document calls.
    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Observable state of the auth gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_email_fallback() {
        let session = Session::from_provider(ProviderSession {
            uid: "u1".to_string(),
            email: None,
            id_token: "id".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in_secs: 3600,
        });
        assert_eq!(session.user().email, NO_EMAIL);
        assert_eq!(session.uid(), "u1");
        assert!(session.expires_at() > Utc::now());
    }
}
