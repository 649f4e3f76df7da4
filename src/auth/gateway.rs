use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use super::provider::{normalize_error, FederatedCredential, IdentityProvider, ProviderError};
use super::types::{AuthState, ProviderSession, Session, User};
use super::validation::validate_sign_up;
use super::{AuthError, FEDERATED_SIGN_IN_FAILED, SIGN_IN_FAILED, SIGN_UP_FAILED};
use crate::documents::{UserDocument, UserDocuments};
use crate::keychain::{SecretStore, SESSION_SERVICE};

/// Front door to the identity provider.
///
/// Holds the current session, publishes it to subscribers, and keeps the
/// refresh token in the secret store so a later run can restore it.
pub struct AuthGateway {
    provider: Arc<dyn IdentityProvider>,
    documents: Arc<dyn UserDocuments>,
    secrets: Arc<dyn SecretStore>,
    state: AuthState,
    session_tx: watch::Sender<Option<Session>>,
}

impl AuthGateway {
    /// Starts out loading until [`AuthGateway::restore`] runs.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        documents: Arc<dyn UserDocuments>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            provider,
            documents,
            secrets,
            state: AuthState {
                user: None,
                is_loading: true,
                error: None,
            },
            session_tx,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// Receive every change of the current session.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    /// Resume the session persisted by an earlier run, if any.
    ///
    /// A token that cannot be exchanged is deleted and the user stays signed
    /// out.
    pub async fn restore(&mut self) -> Option<User> {
        self.state.is_loading = true;
        let stored = self.secrets.get(SESSION_SERVICE).unwrap_or_else(|e| {
            warn!("Could not read stored session: {}", e);
            None
        });

        if let Some(token) = stored {
            match self.provider.refresh(&token).await {
                Ok(provider_session) => {
                    let session = self.establish(provider_session);
                    info!("Restored session for {}", session.uid());
                }
                Err(e) => {
                    warn!("Stored session is no longer valid: {}", e);
                    self.forget_refresh_token();
                }
            }
        }

        self.state.is_loading = false;
        self.state.user.clone()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User, AuthError> {
        self.begin();
        let result = self.provider.sign_in_with_password(email, password).await;
        let session = self.finish_provider_call(result, SIGN_IN_FAILED, "Login")?;
        Ok(session.user().clone())
    }

    /// Create an account and its empty user document.
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, AuthError> {
        self.state.error = None;
        if let Err(message) = validate_sign_up(email, password, confirm) {
            self.state.error = Some(message.to_string());
            return Err(AuthError::Validation(message));
        }

        self.begin();
        let result = self.provider.sign_up(email, password).await;
        let session = self.finish_provider_call(result, SIGN_UP_FAILED, "Signup")?;

        let doc = UserDocument::new(session.user().email.clone());
        if let Err(e) = self.documents.create(&session, &doc).await {
            error!("Failed to create user document for {}: {}", session.uid(), e);
            return Err(self.fail(e.into()));
        }
        Ok(session.user().clone())
    }

    /// Sign in with a credential from a third-party provider, creating the
    /// user document on first sign-in.
    pub async fn sign_in_federated(
        &mut self,
        credential: &FederatedCredential,
    ) -> Result<User, AuthError> {
        self.begin();
        let result = self.provider.sign_in_with_idp(credential).await;
        let session =
            self.finish_provider_call(result, FEDERATED_SIGN_IN_FAILED, "Federated sign-in")?;

        let provisioned = match self.documents.fetch(&session).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                info!("New federated user {}, creating user document", session.uid());
                let doc = UserDocument::new(session.user().email.clone());
                self.documents.create(&session, &doc).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = provisioned {
            error!("Failed to provision user document for {}: {}", session.uid(), e);
            return Err(self.fail(e.into()));
        }
        Ok(session.user().clone())
    }

    /// Drop the session and its persisted refresh token.
    pub fn sign_out(&mut self) {
        if let Some(user) = &self.state.user {
            info!("Signing out {}", user.uid);
        }
        self.state.error = None;
        self.state.user = None;
        self.session_tx.send_replace(None);
        self.forget_refresh_token();
    }

    fn begin(&mut self) {
        self.state.error = None;
        self.state.is_loading = true;
    }

    fn finish_provider_call(
        &mut self,
        result: Result<ProviderSession, ProviderError>,
        fallback: &str,
        operation: &str,
    ) -> Result<Session, AuthError> {
        self.state.is_loading = false;
        match result {
            Ok(provider_session) => Ok(self.establish(provider_session)),
            Err(source) => {
                error!("{} failed: {}", operation, source);
                let message = normalize_error(&source, fallback);
                Err(self.fail(AuthError::Provider { message, source }))
            }
        }
    }

    fn fail(&mut self, err: AuthError) -> AuthError {
        self.state.error = Some(err.to_string());
        err
    }

    fn establish(&mut self, provider_session: ProviderSession) -> Session {
        let session = Session::from_provider(provider_session);
        if let Err(e) = self.secrets.set(SESSION_SERVICE, session.refresh_token()) {
            warn!("Could not persist session: {}", e);
        }
        self.state.user = Some(session.user().clone());
        self.session_tx.send_replace(Some(session.clone()));
        session
    }

    fn forget_refresh_token(&self) {
        if let Err(e) = self.secrets.delete(SESSION_SERVICE) {
            warn!("Could not delete stored session: {}", e);
        }
    }
}
