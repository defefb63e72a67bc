use thiserror::Error;

/// Every failure the client layer can surface to a page.
///
/// The streaming and extraction core never produces these; only the
/// configuration loader and the completion client do.
#[derive(Debug, Error)]
pub enum AppError {
    /// No API key from flag, environment, or config file.
    #[error("Please enter your OpenRouter API key (--api-key, OPENROUTER_API_KEY, or api_key in the config file)")]
    MissingApiKey,

    /// Transport-level failure talking to the completion endpoint.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint replied with a non-2xx status.
    #[error("OpenRouter API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The provider reported an error inside an otherwise successful stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// A non-streaming completion came back without any message content.
    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file exists but could not be parsed.
    #[error("invalid config {path}: {detail}")]
    Config { path: String, detail: String },

    /// User input rejected before any network call (empty prompt, unknown language...).
    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
