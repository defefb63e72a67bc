pub mod chat;
pub mod cli;
pub mod config;
pub mod diagram;
pub mod error;
pub mod extract;
pub mod personas;
pub mod providers;
pub mod stream;
pub mod terminal;
pub mod translate;
pub mod web;

use reqwest::{Client, RequestBuilder};
use tokio_stream::{Stream, StreamExt};

use config::Settings;
use error::{AppError, Result};
use providers::*;
use stream::StreamAccumulator;

// ---------------------------------------------------------------------------
// CompletionClient: OpenRouter chat-completion calls
// ---------------------------------------------------------------------------

/// Thin client over an OpenAI-compatible `/chat/completions` endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    referer: String,
    app_title: String,
    deny_data_collection: bool,
    temperature: Option<f32>,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CompletionClient {
    /// Build a client from settings. Fails when no API key is configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        Ok(CompletionClient {
            client: Client::new(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            referer: settings.referer.clone(),
            app_title: settings.app_title.clone(),
            deny_data_collection: settings.deny_data_collection,
            temperature: settings.temperature,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn build_request(&self, model: &str, messages: &[ChatMessage], stream: bool) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            stream,
            temperature: self.temperature,
            provider: self
                .deny_data_collection
                .then(|| ProviderPreferences { data_collection: "deny".to_string() }),
        }
    }

    fn post(&self, body: &ChatRequest) -> RequestBuilder {
        self.client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(body)
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let response = self.post(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    /// Stream a completion, calling `on_snapshot` with the full cleaned
    /// buffer after every content fragment. Returns the finalized text.
    ///
    /// If the transport fails mid-stream the error is returned; whatever was
    /// shown through `on_snapshot` up to that point stays valid.
    pub async fn stream_chat<F>(&self, model: &str, messages: &[ChatMessage], on_snapshot: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        tracing::info!(model, messages = messages.len(), "streaming completion");
        let request = self.build_request(model, messages, true);
        let response = self.send(&request).await?;

        let mut acc = StreamAccumulator::new();
        read_sse(response.bytes_stream(), &mut acc, on_snapshot).await?;
        let text = acc.finalize();
        tracing::info!(model, fragments = acc.fragment_count(), bytes = text.len(), "completion finished");
        Ok(text)
    }

    // -----------------------------------------------------------------------
    // Non-streaming
    // -----------------------------------------------------------------------

    /// One-shot completion; returns the first choice's content, trimmed.
    pub async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String> {
        tracing::info!(model, messages = messages.len(), "requesting completion");
        let request = self.build_request(model, messages, false);
        let response = self.send(&request).await?;
        let body: ChatCompletion = response.json().await?;
        let text = body.content().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(AppError::EmptyCompletion);
        }
        tracing::info!(model, bytes = text.len(), "completion finished");
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// SSE decoding
// ---------------------------------------------------------------------------

/// What one SSE line means for the accumulator.
#[derive(Debug, PartialEq)]
pub enum SseLine {
    Content(String),
    Done,
    Skip,
}

/// Interpret a single (already trimmed) SSE line.
///
/// Comments (`: OPENROUTER PROCESSING`), blank lines, non-data fields and
/// undecodable payloads are skipped. An `{"error": ...}` payload is an error.
pub fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    // A chunk decodes leniently, so the error envelope has to be tried first.
    if let Ok(env) = serde_json::from_str::<ApiErrorEnvelope>(data) {
        tracing::warn!(message = %env.error.message, "provider error inside stream");
        return Err(AppError::Stream(env.error.message));
    }
    match serde_json::from_str::<ChatChunk>(data) {
        Ok(chunk) => Ok(chunk
            .content()
            .map(|c| SseLine::Content(c.to_string()))
            .unwrap_or(SseLine::Skip)),
        Err(e) => {
            tracing::debug!(error = %e, "skipping undecodable SSE line");
            Ok(SseLine::Skip)
        }
    }
}

/// Drain an SSE byte stream into `acc`.
///
/// Lines are split on raw bytes before UTF-8 decoding so a multi-byte
/// character cut across two network chunks survives intact.
pub async fn read_sse<S, B, E, F>(stream: S, acc: &mut StreamAccumulator, mut on_snapshot: F) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<AppError>,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            match parse_sse_line(line.trim())? {
                SseLine::Content(fragment) => on_snapshot(acc.ingest(&fragment)),
                SseLine::Done => return Ok(()),
                SseLine::Skip => {}
            }
        }
    }

    // Trailing line without a newline.
    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer);
        if let SseLine::Content(fragment) = parse_sse_line(line.trim())? {
            on_snapshot(acc.ingest(&fragment));
        }
    }
    Ok(())
}
