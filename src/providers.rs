use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Models offered in the model picker.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModelChoice {
    Deepseek,
    Gemini,
    Claude,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 3] = [ModelChoice::Deepseek, ModelChoice::Gemini, ModelChoice::Claude];

    /// Human-facing label shown in pickers.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelChoice::Deepseek => "DeepSeek V3.2",
            ModelChoice::Gemini => "Google Gemini 2.5 Flash",
            ModelChoice::Claude => "Claude Sonnet 4",
        }
    }

    /// OpenRouter model id sent on the wire.
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelChoice::Deepseek => "deepseek/deepseek-v3.2",
            ModelChoice::Gemini => "google/gemini-2.5-flash",
            ModelChoice::Claude => "anthropic/claude-sonnet-4",
        }
    }

    pub fn from_model_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.model_id() == id)
    }
}

impl std::fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.model_id())
    }
}

// -- Chat messages ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

// -- Request ------------------------------------------------------------------

/// OpenRouter routing preferences. `data_collection: "deny"` keeps prompts
/// away from providers that train on them.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderPreferences {
    pub data_collection: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderPreferences>,
}

// -- Streaming response (SSE) -------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatDelta {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChunkChoice {
    pub delta: ChatDelta,
    #[allow(dead_code)]
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChatChunkChoice>,
}

impl ChatChunk {
    /// Content of the first choice's delta, if any.
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.delta.content.as_deref())
    }
}

// -- Non-streaming response ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

impl ChatCompletion {
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

// -- Errors -------------------------------------------------------------------

/// `{"error": {"message": ..., "code": ...}}`, used both for non-2xx bodies
/// and for errors OpenRouter injects into a running stream.
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

/// Best human-readable message from an error body, falling back to the raw
/// text when it is not the usual envelope.
pub fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => body.trim().to_string(),
    }
}
