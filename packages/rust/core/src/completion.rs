//! Language-model completion capability.
//!
//! Two implementations:
//! - [`OpenRouterClient`]: OpenAI-compatible chat-completions over HTTP
//! - [`MockCompletionClient`]: canned per-field responses (testing)

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use proposalgen_shared::{AppConfig, FieldKey, ProposalError, Result, read_api_key};

/// Marker line identifying the target field inside a stage's system prompt.
pub const FIELD_MARKER: &str = "Proposal field: ";

// ---------------------------------------------------------------------------
// Messages and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Requested output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Free text.
    Text,
    /// A JSON object.
    Json,
}

/// A successful completion.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    Json(Value),
}

/// Errors from completion calls. Any of these means "stage failed".
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response had no content")]
    Empty,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("completion unavailable: {0}")]
    Unavailable(String),
}

/// Client trait for the completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        mode: OutputMode,
    ) -> std::result::Result<Completion, CompletionError>;
}

/// Parse model output as JSON, tolerating a surrounding ```json fence.
pub fn parse_json_content(content: &str) -> std::result::Result<Value, CompletionError> {
    let trimmed = content.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    };
    serde_json::from_str(body).map_err(|e| CompletionError::InvalidJson(e.to_string()))
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenRouter or any OpenAI-compatible endpoint.
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("proposalgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProposalError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Build from `[openrouter]` config; the API key comes from the configured env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = read_api_key(config)?;
        Self::new(
            &config.openrouter.base_url,
            api_key,
            &config.openrouter.default_model,
            Duration::from_secs(config.openrouter.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        mode: OutputMode,
    ) -> std::result::Result<Completion, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            response_format: match mode {
                OutputMode::Json => Some(ResponseFormat {
                    kind: "json_object",
                }),
                OutputMode::Text => None,
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(CompletionError::Empty)?;
        debug!(model = %self.model, chars = content.len(), "completion received");

        match mode {
            OutputMode::Text => Ok(Completion::Text(content)),
            OutputMode::Json => parse_json_content(&content).map(Completion::Json),
        }
    }
}

// ---------------------------------------------------------------------------
// MockCompletionClient
// ---------------------------------------------------------------------------

/// A recorded call to [`MockCompletionClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Field named by the prompt marker, if any.
    pub field: Option<FieldKey>,
    pub mode: OutputMode,
    pub messages: Vec<ChatMessage>,
}

/// Mock client returning canned results keyed by the prompt's target field.
#[derive(Default)]
pub struct MockCompletionClient {
    responses: HashMap<FieldKey, std::result::Result<Completion, CompletionError>>,
    fail_all: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, field: FieldKey, text: impl Into<String>) -> Self {
        self.responses
            .insert(field, Ok(Completion::Text(text.into())));
        self
    }

    pub fn with_json(mut self, field: FieldKey, value: Value) -> Self {
        self.responses.insert(field, Ok(Completion::Json(value)));
        self
    }

    pub fn with_failure(mut self, field: FieldKey, error: CompletionError) -> Self {
        self.responses.insert(field, Err(error));
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Target fields of the calls made so far, in order.
    pub fn called_fields(&self) -> Vec<FieldKey> {
        self.calls().into_iter().filter_map(|c| c.field).collect()
    }
}

/// Read the target field from the marker line of the first system message.
fn marked_field(messages: &[ChatMessage]) -> Option<FieldKey> {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .flat_map(|m| m.content.lines())
        .find_map(|line| line.trim().strip_prefix(FIELD_MARKER))
        .and_then(|key| key.trim().parse().ok())
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        mode: OutputMode,
    ) -> std::result::Result<Completion, CompletionError> {
        let field = marked_field(messages);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                field,
                mode,
                messages: messages.to_vec(),
            });

        if self.fail_all {
            return Err(CompletionError::Unavailable("mock configured to fail".into()));
        }
        match field.and_then(|f| self.responses.get(&f)) {
            Some(response) => response.clone(),
            None => Err(CompletionError::Unavailable(
                "no canned response for this field".into(),
            )),
        }
    }
}
