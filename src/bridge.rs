//! Prompt/response bridge to an OpenAI-compatible chat-completion endpoint.
//!
//! Every page funnels through [`Bridge::ask`]: one system instruction, one user
//! prompt, one request. Failures never leave the bridge; callers get the fixed
//! [`FALLBACK_REPLY`] plus an error notice to show next to it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const FALLBACK_REPLY: &str = "Sorry, AI is currently unavailable.";
pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

#[derive(Clone)]
pub struct BridgeConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("response contained no completion")]
    EmptyCompletion,
}

/// Transport seam for a single chat completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BridgeError>;
}

pub struct HttpCompletionClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            http: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BridgeError> {
        if self.api_key.trim().is_empty() {
            return Err(BridgeError::MissingApiKey);
        }
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        first_choice_text(&bytes)
    }
}

fn first_choice_text(body: &[u8]) -> Result<String, BridgeError> {
    let parsed: CompletionResponse =
        serde_json::from_slice(body).map_err(|err| BridgeError::Decode(err.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(BridgeError::EmptyCompletion)
}

/// What a page shows after asking the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeReply {
    pub text: String,
    pub error: Option<String>,
}

impl BridgeReply {
    fn answered(text: String) -> Self {
        Self { text, error: None }
    }

    fn unavailable(err: &BridgeError) -> Self {
        Self {
            text: FALLBACK_REPLY.to_string(),
            error: Some(format!("AI Error: {err}")),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Clone)]
pub struct Bridge {
    client: Arc<dyn CompletionClient>,
    model: String,
}

impl Bridge {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            Arc::new(HttpCompletionClient::new(config)),
            config.model.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn ask(&self, prompt: &str, system_role: &str) -> BridgeReply {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system_role), ChatMessage::user(prompt)],
        };
        match self.client.complete(&request).await {
            Ok(text) => {
                debug!(model = %self.model, chars = text.len(), "completion received");
                BridgeReply::answered(text)
            }
            Err(err) => {
                warn!(model = %self.model, error = %err, "completion failed");
                BridgeReply::unavailable(&err)
            }
        }
    }
}
