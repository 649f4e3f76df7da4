use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::{error, info};
use url::Url;

use super::value::{decode, decode_fields, encode};
use super::{RemoteError, UserDocument, UserDocuments};
use crate::auth::Session;
use crate::history::HistoryData;

pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Collection holding one document per user.
const USERS_COLLECTION: &str = "users";

/// User documents stored in Cloud Firestore through its REST API.
pub struct FirestoreDocuments {
    client: reqwest::Client,
    endpoint: Url,
    project_id: String,
}

impl FirestoreDocuments {
    pub fn new(endpoint: &str, project_id: &str) -> Result<Self, RemoteError> {
        if project_id.trim().is_empty() {
            return Err(RemoteError::Config("firebase.project_id is not set".to_string()));
        }
        let endpoint = Url::parse(endpoint)
            .map_err(|e| RemoteError::Config(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            project_id: project_id.to_string(),
        })
    }

    fn document_url(&self, uid: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            urlencoding::encode(&self.project_id),
            USERS_COLLECTION,
            urlencoding::encode(uid)
        )
    }

    async fn patch(
        &self,
        session: &Session,
        fields: Map<String, Value>,
        update_mask: Option<&str>,
    ) -> Result<(), RemoteError> {
        let mut request = self
            .client
            .patch(self.document_url(session.uid()))
            .bearer_auth(session.id_token())
            .json(&json!({ "fields": fields }));
        if let Some(mask) = update_mask {
            request = request.query(&[("updateMask.fieldPaths", mask)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = RemoteError::Status { status, body };
            error!("Firestore write failed for {}: {}", session.uid(), err);
            return Err(err);
        }
        Ok(())
    }
}

fn history_value(history: &HistoryData) -> Result<Value, RemoteError> {
    serde_json::to_value(history)
        .map(|v| encode(&v))
        .map_err(|e| RemoteError::Malformed(format!("Failed to serialize history: {}", e)))
}

/// Build the Firestore `fields` map for a full user document.
pub(crate) fn document_fields(doc: &UserDocument) -> Result<Map<String, Value>, RemoteError> {
    let mut fields = Map::new();
    fields.insert("email".to_string(), json!({ "stringValue": doc.email }));
    fields.insert(
        "createdAt".to_string(),
        json!({ "timestampValue": doc.created_at.to_rfc3339_opts(SecondsFormat::Millis, true) }),
    );
    fields.insert("history".to_string(), history_value(&doc.history)?);
    Ok(fields)
}

/// Parse a Firestore document resource into a `UserDocument`.
///
/// A missing `history` field yields empty history. A present one that does
/// not decode is an error, so the caller never mistakes it for empty.
pub(crate) fn parse_document(resource: &Value) -> Result<UserDocument, RemoteError> {
    if resource.get("fields").is_none() && resource.get("name").is_none() {
        return Err(RemoteError::Malformed("document has no fields".to_string()));
    }

    let fields = &resource["fields"];
    let email = decode(&fields["email"]).as_str().unwrap_or_default().to_string();
    let created_at = decode(&fields["createdAt"])
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            resource["createTime"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        })
        .unwrap_or_else(Utc::now);

    let history = match fields.get("history") {
        Some(v) => {
            let plain = Value::Object(decode_fields(&v["mapValue"]["fields"]));
            serde_json::from_value(plain).map_err(|e| {
                error!("Remote history is malformed: {}", e);
                RemoteError::Malformed(format!("history: {}", e))
            })?
        }
        None => HistoryData::default(),
    };

    Ok(UserDocument {
        email,
        created_at,
        history,
    })
}

#[async_trait]
impl UserDocuments for FirestoreDocuments {
    async fn fetch(&self, session: &Session) -> Result<Option<UserDocument>, RemoteError> {
        let response = self
            .client
            .get(self.document_url(session.uid()))
            .bearer_auth(session.id_token())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            info!("No user document for {}", session.uid());
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = RemoteError::Status { status, body };
            error!("Firestore read failed for {}: {}", session.uid(), err);
            return Err(err);
        }

        let resource: Value = response.json().await?;
        parse_document(&resource).map(Some)
    }

    async fn create(&self, session: &Session, doc: &UserDocument) -> Result<(), RemoteError> {
        info!("Creating user document for {}", session.uid());
        self.patch(session, document_fields(doc)?, None).await
    }

    async fn replace_history(
        &self,
        session: &Session,
        history: &HistoryData,
    ) -> Result<(), RemoteError> {
        let mut fields = Map::new();
        fields.insert("history".to_string(), history_value(history)?);
        self.patch(session, fields, Some("history")).await?;
        info!(
            "Replicated history for {} ({} products, {} overhauls)",
            session.uid(),
            history.products.len(),
            history.overhauls.len()
        );
        Ok(())
    }
}
