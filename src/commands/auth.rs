use serde::Serialize;

use crate::app::App;
use crate::auth::{AuthState, FederatedCredential, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    /// Whether sign-in is set up at all.
    pub configured: bool,
    #[serde(flatten)]
    pub state: AuthState,
}

pub async fn login(app: &mut App, email: &str, password: &str) -> Result<User, String> {
    let user = app.auth_mut()?.sign_in(email.trim(), password).await?;
    Ok(user)
}

pub async fn signup(
    app: &mut App,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<User, String> {
    let user = app
        .auth_mut()?
        .sign_up(email.trim(), password, confirm)
        .await?;
    Ok(user)
}

/// Sign in with a Google ID token.
pub async fn google(app: &mut App, id_token: &str) -> Result<User, String> {
    let credential = FederatedCredential::google(id_token.trim());
    let user = app.auth_mut()?.sign_in_federated(&credential).await?;
    Ok(user)
}

/// Sign out and switch history back to the signed-out owner.
pub async fn logout(app: &mut App) -> Result<(), String> {
    app.auth_mut()?.sign_out();
    app.sync_history().await?;
    Ok(())
}

pub fn status(app: &App) -> AuthStatus {
    match app.auth() {
        Some(auth) => AuthStatus {
            configured: true,
            state: auth.state().clone(),
        },
        None => AuthStatus {
            configured: false,
            state: AuthState::default(),
        },
    }
}
