//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! All OpenAI wire types are private to this module. Each call is a single
//! round-trip with an optional system message and one user message.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::check_status;
use super::sse::{self, EventParser};
use crate::llm::{LlmResponse, LlmUsage, ProviderError, StreamPart, TextStream};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Covers OpenAI and compatible local servers (Ollama, LM Studio…).
/// Cheap to clone because `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl std::fmt::Debug for OpenAiCompatibleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    fn payload(&self, content: &str, system: Option<&str>, stream: bool) -> ChatCompletionRequest {
        // Some models (gpt-5 family) do not accept a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") {
            None
        } else {
            Some(self.temperature)
        };

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(Message { role: "system".to_string(), content: sys.to_string() });
        }
        messages.push(Message { role: "user".to_string(), content: content.to_string() });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    async fn send(&self, payload: &ChatCompletionRequest) -> Result<reqwest::Response, ProviderError> {
        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            stream = payload.stream,
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        check_status("openai", response, error_message).await
    }

    /// Send `content` as the user message and optionally `system` as the system prompt.
    pub async fn complete(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let payload = self.payload(content, system, false);
        let response = self.send(&payload).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");
        into_llm_response(parsed)
    }

    /// Streamed variant using `stream: true` server-sent events.
    pub async fn stream(
        &self,
        content: &str,
        system: Option<&str>,
    ) -> Result<TextStream, ProviderError> {
        let payload = self.payload(content, system, true);
        let response = self.send(&payload).await?;

        Ok(sse::event_stream(response.bytes_stream(), OpenAiEvents::default()))
    }
}

/// Streamed `chat.completion.chunk` events.
#[derive(Debug, Default)]
struct OpenAiEvents {
    usage: Option<LlmUsage>,
}

impl EventParser for OpenAiEvents {
    const PROVIDER: &'static str = "openai";

    fn parse(&mut self, data: &str) -> Result<Vec<StreamPart>, ProviderError> {
        let chunk = serde_json::from_str::<ChatCompletionChunk>(data)
            .map_err(|e| ProviderError::Stream(format!("malformed event: {e}")))?;
        if let Some(u) = chunk.usage.as_ref() {
            self.usage = Some(u.into());
        }

        let mut parts = Vec::new();
        for choice in chunk.choices {
            if let Some(r) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
                parts.push(StreamPart::ReasoningDelta(r));
            }
            if let Some(t) = choice.delta.content.filter(|t| !t.is_empty()) {
                parts.push(StreamPart::TextDelta(t));
            }
        }
        Ok(parts)
    }

    fn take_usage(&mut self) -> Option<LlmUsage> {
        self.usage.take()
    }
}

fn into_llm_response(parsed: ChatCompletionResponse) -> Result<LlmResponse, ProviderError> {
    if tracing::enabled!(tracing::Level::TRACE) {
        let json = serde_json::to_string_pretty(&parsed)
            .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
        trace!(response = %json, "full LLM response payload");
    }

    let usage = parsed.usage.as_ref().map(LlmUsage::from);
    let message = parsed.choices.into_iter().next().map(|c| c.message);

    let reasoning = message
        .as_ref()
        .and_then(|m| m.reasoning_content.clone())
        .filter(|s| !s.trim().is_empty());

    let text = message
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))?;

    Ok(LlmResponse { text, reasoning, usage })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

impl From<&UsageData> for LlmUsage {
    fn from(u: &UsageData) -> Self {
        LlmUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            cached_input_tokens: u.prompt_tokens_details.as_ref().map(|d| d.cached_tokens).unwrap_or(0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    // Emitted by DeepSeek-style compatible servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    }
}
