//! Sign-in, sign-up, and the current-session signal.

pub mod firebase;
pub mod gateway;
pub mod provider;
pub mod types;
pub mod validation;

use thiserror::Error;

use crate::documents::RemoteError;

pub use firebase::FirebaseAuth;
pub use gateway::AuthGateway;
pub use provider::{normalize_error, FederatedCredential, IdentityProvider, ProviderError};
pub use types::{AuthState, ProviderSession, Session, User, NO_EMAIL};

pub const SIGN_IN_FAILED: &str = "Failed to sign in.";
pub const SIGN_UP_FAILED: &str = "Failed to sign up.";
pub const FEDERATED_SIGN_IN_FAILED: &str = "Failed to sign in with Google.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Input rejected before contacting the provider.
    #[error("{0}")]
    Validation(&'static str),

    #[error("{message}")]
    Provider {
        message: String,
        #[source]
        source: ProviderError,
    },

    /// The account exists but its user document could not be set up.
    #[error("Your account was created but could not be set up: {0}")]
    Storage(#[from] RemoteError),
}

impl From<AuthError> for String {
    fn from(err: AuthError) -> String {
        err.to_string()
    }
}
