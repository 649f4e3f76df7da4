use async_trait::async_trait;
use thiserror::Error;

use super::types::ProviderSession;

/// Provider id of Google accounts for federated sign-in.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider refused the request and reported an error code.
    #[error("Identity provider rejected the request: {code}")]
    Rejected { code: String },

    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected identity provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Rejected { code } => Some(code),
            _ => None,
        }
    }
}

/// A credential issued by a third-party identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    pub provider_id: String,
    pub id_token: String,
}

impl FederatedCredential {
    pub fn google(id_token: impl Into<String>) -> Self {
        Self {
            provider_id: GOOGLE_PROVIDER_ID.to_string(),
            id_token: id_token.into(),
        }
    }
}

/// Account operations of an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError>;

    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderSession, ProviderError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, ProviderError>;
}

/// Turn a provider failure into a short user-facing message.
///
/// `auth/wrong-password` becomes `wrong password` and
/// `WEAK_PASSWORD : Password should be at least 6 characters` becomes
/// `weak password`. Failures without a code use `fallback`.
pub fn normalize_error(err: &ProviderError, fallback: &str) -> String {
    let Some(code) = err.code() else {
        return fallback.to_string();
    };
    let code = code.strip_prefix("auth/").unwrap_or(code);
    let code = code.split(" : ").next().unwrap_or(code).trim();
    if code.is_empty() {
        return fallback.to_string();
    }
    code.replace(['-', '_'], " ").to_lowercase()
}
