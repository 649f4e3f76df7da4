//! Wires settings, secrets, the AI backend, auth, and history together.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::analyzer::{Advisor, GeminiClient, GenerativeBackend};
use crate::auth::{AuthGateway, FirebaseAuth, IdentityProvider, Session, User};
use crate::config::Settings;
use crate::documents::{FirestoreDocuments, Unconfigured, UserDocuments};
use crate::error::NutriLifeError;
use crate::history::{HistoryError, HistoryStore, LocalSlot};
use crate::keychain::{resolve_api_key, SecretStore, FIREBASE_SERVICE, GEMINI_SERVICE};

pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
pub const FIREBASE_KEY_ENV: &str = "FIREBASE_API_KEY";

const NO_GEMINI_KEY: &str =
    "Gemini API key not set. Run `nutrilife key set gemini <KEY>` or set GEMINI_API_KEY.";
const NO_SIGN_IN: &str = "Sign-in is not configured. Set firebase.project_id with `nutrilife config set` and store a Firebase API key with `nutrilife key set firebase <KEY>`.";

/// Collaborators an [`App`] is assembled from.
pub struct Parts {
    pub settings: Settings,
    pub config_path: PathBuf,
    pub secrets: Arc<dyn SecretStore>,
    /// `None` when no AI key is available.
    pub backend: Option<Arc<dyn GenerativeBackend>>,
    /// `None` when sign-in is not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub documents: Arc<dyn UserDocuments>,
}

pub struct App {
    settings: Settings,
    config_path: PathBuf,
    secrets: Arc<dyn SecretStore>,
    advisor: Option<Advisor>,
    auth: Option<AuthGateway>,
    session_rx: Option<watch::Receiver<Option<Session>>>,
    history: HistoryStore,
}

impl App {
    /// Build the production app: Gemini, Firebase Auth, Firestore, and the
    /// local SQLite slot, then restore any persisted session.
    pub async fn open(
        settings: Settings,
        config_path: PathBuf,
        secrets: Arc<dyn SecretStore>,
    ) -> Result<Self, NutriLifeError> {
        let gemini_key = resolve_api_key(secrets.as_ref(), GEMINI_SERVICE, GEMINI_KEY_ENV)?;
        let backend: Option<Arc<dyn GenerativeBackend>> = match gemini_key {
            Some(key) => Some(Arc::new(
                GeminiClient::new(key, &settings.ai.endpoint)
                    .map_err(|e| NutriLifeError::Config(e.to_string()))?,
            )),
            None => None,
        };

        let firebase_key = resolve_api_key(secrets.as_ref(), FIREBASE_SERVICE, FIREBASE_KEY_ENV)?;
        let (identity, documents) = match firebase_key {
            Some(key) if !settings.firebase.project_id.trim().is_empty() => {
                let fb = &settings.firebase;
                let identity: Arc<dyn IdentityProvider> = Arc::new(
                    FirebaseAuth::new(&key, &fb.auth_endpoint, &fb.token_endpoint)
                        .map_err(|e| NutriLifeError::Config(e.to_string()))?,
                );
                let documents: Arc<dyn UserDocuments> = Arc::new(
                    FirestoreDocuments::new(&fb.firestore_endpoint, &fb.project_id)
                        .map_err(|e| NutriLifeError::Config(e.to_string()))?,
                );
                (Some(identity), documents)
            }
            _ => {
                info!("Sign-in not configured, running anonymously");
                let documents: Arc<dyn UserDocuments> = Arc::new(Unconfigured);
                (None, documents)
            }
        };

        let mut app = Self::from_parts(Parts {
            settings,
            config_path,
            secrets,
            backend,
            identity,
            documents,
        })
        .await?;
        app.restore_session().await;
        Ok(app)
    }

    /// Assemble an app from explicit collaborators. No session is restored.
    pub async fn from_parts(parts: Parts) -> Result<Self, NutriLifeError> {
        let local = LocalSlot::new(parts.settings.history_db_path()?);
        let history = HistoryStore::open(
            local,
            parts.documents.clone(),
            parts.settings.history.local_when_signed_out,
        )
        .await;

        let advisor = parts
            .backend
            .map(|backend| Advisor::new(backend, parts.settings.ai.model.clone()));
        let auth = parts
            .identity
            .map(|identity| AuthGateway::new(identity, parts.documents, parts.secrets.clone()));
        let session_rx = auth.as_ref().map(AuthGateway::subscribe);

        Ok(Self {
            settings: parts.settings,
            config_path: parts.config_path,
            secrets: parts.secrets,
            advisor,
            auth,
            session_rx,
            history,
        })
    }

    /// Resume the persisted session, if sign-in is configured.
    pub async fn restore_session(&mut self) -> Option<User> {
        let auth = self.auth.as_mut()?;
        auth.restore().await
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn secrets(&self) -> &dyn SecretStore {
        self.secrets.as_ref()
    }

    pub fn advisor(&self) -> Result<&Advisor, NutriLifeError> {
        self.advisor
            .as_ref()
            .ok_or_else(|| NutriLifeError::Config(NO_GEMINI_KEY.to_string()))
    }

    pub fn auth(&self) -> Option<&AuthGateway> {
        self.auth.as_ref()
    }

    pub fn auth_mut(&mut self) -> Result<&mut AuthGateway, NutriLifeError> {
        self.auth
            .as_mut()
            .ok_or_else(|| NutriLifeError::Config(NO_SIGN_IN.to_string()))
    }

    pub fn session(&self) -> Option<Session> {
        self.auth.as_ref().and_then(AuthGateway::session)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    /// Point the history store at the current session.
    ///
    /// Pending session changes from the auth gateway are applied; the first
    /// call also applies the initial session.
    pub async fn sync_history(&mut self) -> Result<(), HistoryError> {
        let session = match self.session_rx.as_mut() {
            Some(rx) => rx.borrow_and_update().clone(),
            None => None,
        };
        self.history.activate(session.as_ref()).await
    }

    /// Wait for queued history replication before exit.
    pub async fn shutdown(&self) {
        self.history.flush().await;
    }
}

