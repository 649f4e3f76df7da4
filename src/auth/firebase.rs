use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use url::Url;

use super::provider::{FederatedCredential, IdentityProvider, ProviderError};
use super::types::ProviderSession;

pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";

/// Redirect URI sent with federated sign-in; the provider only requires it
/// to be a valid URL.
const IDP_REQUEST_URI: &str = "http://localhost";

/// Token lifetime assumed when the provider omits or garbles `expiresIn`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Firebase Authentication over its REST API.
pub struct FirebaseAuth {
    client: reqwest::Client,
    api_key: String,
    auth_endpoint: Url,
    token_endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

impl From<AccountResponse> for ProviderSession {
    fn from(resp: AccountResponse) -> Self {
        ProviderSession {
            uid: resp.local_id,
            email: resp.email,
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
            expires_in_secs: parse_expires_in(resp.expires_in.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(default)]
    email: Option<String>,
}

fn parse_expires_in(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
}

/// Pull the provider's error code out of a failure body.
fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl FirebaseAuth {
    pub fn new(api_key: &str, auth_endpoint: &str, token_endpoint: &str) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Malformed("Firebase API key is empty".to_string()));
        }
        let parse = |raw: &str| {
            Url::parse(raw).map_err(|e| ProviderError::Malformed(format!("{}: {}", raw, e)))
        };
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            auth_endpoint: parse(auth_endpoint)?,
            token_endpoint: parse(token_endpoint)?,
        })
    }

    fn account_url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}",
            self.auth_endpoint.as_str().trim_end_matches('/'),
            method
        )
    }

    async fn read<T: DeserializeOwned>(
        &self,
        operation: &str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!("Firebase {} failed ({}): {}", operation, status, body);
            return Err(match error_code(&body) {
                Some(code) => ProviderError::Rejected { code },
                None => ProviderError::Malformed(format!("HTTP {}", status)),
            });
        }
        serde_json::from_str(&body).map_err(|e| {
            error!("Unreadable Firebase {} response: {}", operation, e);
            ProviderError::Malformed(e.to_string())
        })
    }

    async fn account_call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(self.account_url(method))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        self.read(method, response).await
    }

    async fn lookup_email(&self, id_token: &str) -> Result<Option<String>, ProviderError> {
        let resp: LookupResponse = self
            .account_call("lookup", json!({ "idToken": id_token }))
            .await?;
        Ok(resp.users.into_iter().next().and_then(|u| u.email))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        info!("Signing in {}", email);
        let resp: AccountResponse = self
            .account_call(
                "signInWithPassword",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(resp.into())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderSession, ProviderError> {
        info!("Creating account for {}", email);
        let resp: AccountResponse = self
            .account_call(
                "signUp",
                json!({ "email": email, "password": password, "returnSecureToken": true }),
            )
            .await?;
        Ok(resp.into())
    }

    async fn sign_in_with_idp(
        &self,
        credential: &FederatedCredential,
    ) -> Result<ProviderSession, ProviderError> {
        info!("Signing in with {}", credential.provider_id);
        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(&credential.id_token),
            urlencoding::encode(&credential.provider_id)
        );
        let resp: AccountResponse = self
            .account_call(
                "signInWithIdp",
                json!({
                    "postBody": post_body,
                    "requestUri": IDP_REQUEST_URI,
                    "returnIdpCredential": true,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Ok(resp.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, ProviderError> {
        let url = format!("{}/token", self.token_endpoint.as_str().trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;
        let resp: TokenResponse = self.read("token refresh", response).await?;

        // The token endpoint does not report the email.
        let email = self.lookup_email(&resp.id_token).await?;
        info!("Refreshed session for {}", resp.user_id);
        Ok(ProviderSession {
            uid: resp.user_id,
            email,
            id_token: resp.id_token,
            refresh_token: resp.refresh_token,
            expires_in_secs: parse_expires_in(resp.expires_in.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_body() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert_eq!(error_code(body), Some("EMAIL_EXISTS".to_string()));
        assert_eq!(error_code("<html>bad gateway</html>"), None);
        assert_eq!(error_code(r#"{"error":{"message":""}}"#), None);
    }

    #[test]
    fn test_account_response_to_session() {
        let resp: AccountResponse = serde_json::from_value(json!({
            "localId": "u1",
            "email": "a@b.co",
            "idToken": "id",
            "refreshToken": "refresh",
            "expiresIn": "3600"
        }))
        .unwrap();
        let session = ProviderSession::from(resp);
        assert_eq!(session.uid, "u1");
        assert_eq!(session.email.as_deref(), Some("a@b.co"));
        assert_eq!(session.expires_in_secs, 3600);
    }

    #[test]
    fn test_expires_in_default() {
        assert_eq!(parse_expires_in(None), DEFAULT_EXPIRES_IN_SECS);
        assert_eq!(parse_expires_in(Some("soon")), DEFAULT_EXPIRES_IN_SECS);
        assert_eq!(parse_expires_in(Some(" 120 ")), 120);
    }

    #[test]
    fn test_new_rejects_empty_key() {
        assert!(FirebaseAuth::new("", DEFAULT_AUTH_ENDPOINT, DEFAULT_TOKEN_ENDPOINT).is_err());
        let auth = FirebaseAuth::new("key", DEFAULT_AUTH_ENDPOINT, DEFAULT_TOKEN_ENDPOINT).unwrap();
        assert_eq!(
            auth.account_url("signUp"),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp"
        );
    }
}
