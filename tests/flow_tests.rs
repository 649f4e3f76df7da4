use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use nutrilife::analyzer::{BackendError, GenerateRequest, GenerativeBackend};
use nutrilife::app::{App, Parts};
use nutrilife::auth::{FederatedCredential, IdentityProvider, ProviderError, ProviderSession, Session};
use nutrilife::commands::{analyzer, auth, history, overhaul, recommend};
use nutrilife::config::Settings;
use nutrilife::documents::{RemoteError, UserDocument, UserDocuments};
use nutrilife::history::HistoryData;
use nutrilife::keychain::MemorySecrets;

const ANALYSIS: &str = r#"{
    "productName": "Krave Cereal",
    "overallScore": "D",
    "summary": "Sugary breakfast cereal.",
    "ingredients": [{"name": "Sugar", "impact": "Negative", "description": "Added sugar."}],
    "allergens": ["Wheat"],
    "alternatives": [{"productName": "Plain oats", "reason": "No added sugar."}],
    "imageUrl": "https://example.com/krave.jpg",
    "retailLinks": [{"retailer": "Grocer", "url": "https://example.com/krave"}]
}"#;

const OVERHAUL: &str = r#"{
    "overallSummary": "Cut the sugar.",
    "actionPlan": [{
        "originalProduct": "Soda",
        "priority": "High",
        "reason": "Sugar.",
        "suggestedSwaps": [{"productName": "Sparkling water", "reason": "No sugar."}]
    }],
    "generalAdvice": ["Read labels."]
}"#;

const RECOMMENDATIONS: &str = r#"```json
[{"productName": "Greek yogurt", "reason": "Protein.", "imageSearchTerm": "greek yogurt"}]
```"#;

/// Answers each request according to the response schema it carries.
#[derive(Default)]
struct ScriptedBackend {
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> GenerateRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<String, BackendError> {
        let schema = request.response_schema.clone();
        self.requests.lock().unwrap().push(request);
        let body = if schema["type"] == "ARRAY" {
            RECOMMENDATIONS
        } else if schema["properties"].get("overallSummary").is_some() {
            OVERHAUL
        } else {
            ANALYSIS
        };
        Ok(body.to_string())
    }
}

struct FakeProvider;

fn provider_session(uid: &str, email: &str) -> ProviderSession {
    ProviderSession {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        id_token: format!("id-{}", uid),
        refresh_token: format!("refresh-{}", uid),
        expires_in_secs: 3600,
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        if password != "secret" {
            return Err(ProviderError::Rejected {
                code: "INVALID_LOGIN_CREDENTIALS".to_string(),
            });
        }
        Ok(provider_session("alice", email))
    }

    async fn sign_up(&self, email: &str, _: &str) -> Result<ProviderSession, ProviderError> {
        Ok(provider_session("newbie", email))
    }

    async fn sign_in_with_idp(
        &self,
        _: &FederatedCredential,
    ) -> Result<ProviderSession, ProviderError> {
        Ok(provider_session("googler", "g@example.com"))
    }

    async fn refresh(&self, _: &str) -> Result<ProviderSession, ProviderError> {
        Err(ProviderError::Rejected {
            code: "TOKEN_EXPIRED".to_string(),
        })
    }
}

#[derive(Default)]
struct MemoryDocuments {
    docs: Mutex<HashMap<String, UserDocument>>,
}

impl MemoryDocuments {
    fn history(&self, uid: &str) -> Option<HistoryData> {
        self.docs.lock().unwrap().get(uid).map(|d| d.history.clone())
    }
}

#[async_trait]
impl UserDocuments for MemoryDocuments {
    async fn fetch(&self, session: &Session) -> Result<Option<UserDocument>, RemoteError> {
        Ok(self.docs.lock().unwrap().get(session.uid()).cloned())
    }

    async fn create(&self, session: &Session, doc: &UserDocument) -> Result<(), RemoteError> {
        self.docs
            .lock()
            .unwrap()
            .insert(session.uid().to_string(), doc.clone());
        Ok(())
    }

    async fn replace_history(
        &self,
        session: &Session,
        history: &HistoryData,
    ) -> Result<(), RemoteError> {
        let mut docs = self.docs.lock().unwrap();
        let doc = docs
            .get_mut(session.uid())
            .ok_or_else(|| RemoteError::Malformed("no document".to_string()))?;
        doc.history = history.clone();
        Ok(())
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    documents: Arc<MemoryDocuments>,
}

impl Harness {
    fn new() -> Self {
        Self {
            backend: Arc::new(ScriptedBackend::default()),
            documents: Arc::new(MemoryDocuments::default()),
        }
    }

    async fn app(&self, dir: &Path, local_when_signed_out: bool) -> App {
        let mut settings = Settings::default();
        settings.history.data_dir = Some(dir.join("data"));
        settings.history.local_when_signed_out = local_when_signed_out;
        App::from_parts(Parts {
            settings,
            config_path: dir.join("config.toml"),
            secrets: Arc::new(MemorySecrets::new()),
            backend: Some(self.backend.clone()),
            identity: Some(Arc::new(FakeProvider)),
            documents: self.documents.clone(),
        })
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn test_signed_in_text_analysis_is_recorded_remotely() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .documents
        .docs
        .lock()
        .unwrap()
        .insert("alice".to_string(), UserDocument::new("alice@example.com"));
    let mut app = harness.app(dir.path(), true).await;

    auth::login(&mut app, "alice@example.com", "secret").await.unwrap();
    let outcome = analyzer::analyze(&mut app, "Krave Cereal", None).await.unwrap();

    assert!(outcome.saved);
    assert_eq!(outcome.analysis.product_name, "Krave Cereal");
    let request = harness.backend.last();
    assert!(!request.has_image());
    assert!(request.text().contains("Krave Cereal"));

    let products = &app.history().history().products;
    assert_eq!(products[0].query, "Krave Cereal");

    app.shutdown().await;
    let remote = harness.documents.history("alice").unwrap();
    assert_eq!(remote.products.len(), 1);
    assert_eq!(remote.products[0].query, "Krave Cereal");
}

#[tokio::test]
async fn test_anonymous_overhaul_is_not_recorded() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    let outcome = overhaul::overhaul(&mut app, "soda, chips").await.unwrap();
    assert!(!outcome.saved);
    assert_eq!(outcome.notice.as_deref(), Some(overhaul::SIGN_IN_TO_SAVE));
    assert_eq!(outcome.plan.action_plan[0].original_product, "Soda");
    assert!(app.history().history().overhauls.is_empty());
}

#[tokio::test]
async fn test_signed_in_overhaul_is_recorded() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    auth::signup(&mut app, "new@example.com", "secret", "secret")
        .await
        .unwrap();
    let outcome = overhaul::overhaul(&mut app, "  soda, chips \n").await.unwrap();
    assert!(outcome.saved);
    assert!(outcome.notice.is_none());

    app.shutdown().await;
    let remote = harness.documents.history("newbie").unwrap();
    assert_eq!(remote.overhauls[0].query, "soda, chips");
}

#[tokio::test]
async fn test_anonymous_analysis_persists_across_runs() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();

    let mut app = harness.app(dir.path(), true).await;
    analyzer::analyze(&mut app, "Krave Cereal", None).await.unwrap();
    app.shutdown().await;
    drop(app);

    let mut reopened = harness.app(dir.path(), true).await;
    let items = history::list(&mut reopened, None, None).await.unwrap();
    assert_eq!(items.len(), 1);
    assert!(harness.documents.docs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_inputs_skip_the_backend() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    let err = analyzer::analyze(&mut app, "   ", None).await.unwrap_err();
    assert_eq!(err, analyzer::NO_PRODUCT_INPUT);
    let err = overhaul::overhaul(&mut app, "\n").await.unwrap_err();
    assert_eq!(err, overhaul::NO_PRODUCT_LIST);
    assert_eq!(harness.backend.calls(), 0);
}

#[tokio::test]
async fn test_image_only_analysis_uses_image_query() {
    let dir = TempDir::new().unwrap();
    let photo = dir.path().join("label.png");
    image::RgbImage::from_pixel(2048, 1024, image::Rgb([200, 180, 40]))
        .save(&photo)
        .unwrap();

    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;
    let outcome = analyzer::analyze(&mut app, "", Some(&photo)).await.unwrap();

    assert!(outcome.saved);
    assert!(harness.backend.last().has_image());
    assert_eq!(
        app.history().history().products[0].query,
        analyzer::IMAGE_ONLY_QUERY
    );
}

#[tokio::test]
async fn test_logout_keeps_remote_copy_and_returns_to_local() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    harness
        .documents
        .docs
        .lock()
        .unwrap()
        .insert("alice".to_string(), UserDocument::new("alice@example.com"));
    let mut app = harness.app(dir.path(), true).await;

    auth::login(&mut app, "alice@example.com", "secret").await.unwrap();
    analyzer::analyze(&mut app, "Krave Cereal", None).await.unwrap();
    auth::logout(&mut app).await.unwrap();

    assert!(app.history().history().is_empty());
    app.shutdown().await;
    assert_eq!(harness.documents.history("alice").unwrap().products.len(), 1);
}

#[tokio::test]
async fn test_failed_login_reports_normalized_error() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    let err = auth::login(&mut app, "alice@example.com", "wrong").await.unwrap_err();
    assert_eq!(err, "invalid login credentials");
    let status = auth::status(&app);
    assert!(status.configured);
    assert!(status.state.user.is_none());
    assert_eq!(status.state.error.as_deref(), Some("invalid login credentials"));
}

#[tokio::test]
async fn test_recommendations_need_history() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    let outcome = recommend::recommend(&mut app).await.unwrap();
    assert!(outcome.recommendations.is_empty());
    assert_eq!(outcome.notice.as_deref(), Some(recommend::NO_HISTORY));
    assert_eq!(harness.backend.calls(), 0);
}

#[tokio::test]
async fn test_recommendations_skip_backend_without_liked_products() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    // Krave Cereal scores D, so nothing is liked yet.
    analyzer::analyze(&mut app, "Krave Cereal", None).await.unwrap();
    let outcome = recommend::recommend(&mut app).await.unwrap();
    assert!(outcome.recommendations.is_empty());
    assert_eq!(outcome.notice.as_deref(), Some(recommend::NO_LIKED_PRODUCTS));
    assert_eq!(harness.backend.calls(), 1);
}

#[tokio::test]
async fn test_clear_requires_history_owner() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();

    let mut signed_out = harness.app(dir.path(), false).await;
    let err = history::clear(&mut signed_out).await.unwrap_err();
    assert_eq!(err, history::HISTORY_UNAVAILABLE);

    let mut anonymous = harness.app(&dir.path().join("anon"), true).await;
    analyzer::analyze(&mut anonymous, "Krave Cereal", None).await.unwrap();
    history::clear(&mut anonymous).await.unwrap();
    assert_eq!(*anonymous.history().history(), HistoryData::default());
}

#[tokio::test]
async fn test_google_sign_in_provisions_document() {
    let dir = TempDir::new().unwrap();
    let harness = Harness::new();
    let mut app = harness.app(dir.path(), true).await;

    let user = auth::google(&mut app, "google-id-token").await.unwrap();
    assert_eq!(user.email, "g@example.com");
    assert!(harness.documents.history("googler").unwrap().is_empty());
}
