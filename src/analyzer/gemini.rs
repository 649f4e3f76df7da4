//! Schema-constrained generation against the Gemini `generateContent` API.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use super::validation::{SchemaViolation, Validate};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("AI API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI API error: {status} - {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("No text content in AI API response")]
    EmptyResponse,

    #[error("Failed to parse AI response as JSON: {source}. Raw response (first 500 chars): {raw}")]
    Parse {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("AI response does not match the expected schema: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("Invalid AI endpoint: {0}")]
    Endpoint(String),
}

/// One piece of request content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage { media_type: String, data: String },
}

/// A single "generate content from prompt plus schema" call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: String,
    /// Output must be JSON conforming to this schema.
    pub response_schema: Value,
}

impl GenerateRequest {
    pub fn has_image(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::InlineImage { .. }))
    }

    /// Concatenated text parts, mostly useful for logging and tests.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Backend that turns a request into raw response text.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, BackendError>;
}

// -- Wire types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    system_instruction: WireContent,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: WireInlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Deserialize)]
struct WireCandidate {
    content: Option<WireResponseContent>,
}

#[derive(Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Deserialize)]
struct WireResponsePart {
    text: Option<String>,
}

fn to_wire(request: GenerateRequest) -> WireRequest {
    let parts = request
        .parts
        .into_iter()
        .map(|p| match p {
            Part::Text(text) => WirePart::Text { text },
            Part::InlineImage { media_type, data } => WirePart::InlineData {
                inline_data: WireInlineData {
                    mime_type: media_type,
                    data,
                },
            },
        })
        .collect();

    WireRequest {
        contents: vec![WireContent {
            role: Some("user"),
            parts,
        }],
        system_instruction: WireContent {
            role: None,
            parts: vec![WirePart::Text {
                text: request.system_instruction,
            }],
        },
        generation_config: WireGenerationConfig {
            response_mime_type: "application/json",
            response_schema: request.response_schema,
        },
    }
}

fn extract_text(body: &str) -> Result<String, BackendError> {
    let response: WireResponse = serde_json::from_str(body).map_err(|source| BackendError::Parse {
        source,
        raw: truncate(body, 500),
    })?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(text)
}

/// HTTP client for the Gemini API.
///
/// No request timeout is set: calls wait until the transport resolves.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: Url,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, endpoint: &str) -> Result<Self, BackendError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| BackendError::Endpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.as_str().trim_end_matches('/'),
            urlencoding::encode(model)
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, BackendError> {
        let url = self.generate_url(&request.model);
        info!(
            "Calling model '{}' (image: {})",
            request.model,
            request.has_image()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&to_wire(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let msg = BackendError::Status {
                status,
                body: truncate(&body, 1024),
            };
            error!("{}", msg);
            return Err(msg);
        }

        debug!("AI response body: {} bytes", body.len());
        extract_text(&body)
    }
}

/// Strip markdown code fences from a response if present.
pub fn strip_markdown_json(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let after_open = match trimmed.find('\n') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed.trim_start_matches('`'),
    };
    let cleaned = after_open.trim_end();
    cleaned.strip_suffix("```").unwrap_or(cleaned).trim()
}

/// Parse response text into `T` and run its field checks.
pub fn parse_structured<T>(text: &str) -> Result<T, BackendError>
where
    T: DeserializeOwned + Validate,
{
    let json_text = strip_markdown_json(text);
    let value: T = serde_json::from_str(json_text).map_err(|source| BackendError::Parse {
        source,
        raw: truncate(json_text, 500),
    })?;
    value.validate()?;
    Ok(value)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
