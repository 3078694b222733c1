//! Google Gemini provider (`generateContent` / `streamGenerateContent`).
//!
//! All Gemini wire types are private to this module. The API key travels in
//! the `x-goog-api-key` header, never in the URL, so it cannot leak into logs.
//! Parts flagged `thought: true` are surfaced as reasoning.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::check_status;
use super::sse::{self, EventParser};
use crate::llm::{LlmResponse, LlmUsage, ProviderError, StreamPart, TextStream};

/// Handle for one Gemini model. Cheap to clone: `reqwest::Client` is an
/// `Arc` internally.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            api_key,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.api_base_url, self.model)
    }

    fn request_body(&self, prompt: &str, system: Option<&str>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text(prompt)],
            }],
            system_instruction: system.map(|s| Content { role: None, parts: vec![Part::text(s)] }),
            generation_config: GenerationConfig { temperature: self.temperature },
        }
    }

    async fn send(
        &self,
        url: &str,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        debug!(model = %self.model, url, "sending gemini request");
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(body)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full gemini request payload");
        }

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(url, error = %e, "gemini HTTP request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        check_status("gemini", response, error_message).await
    }

    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        let body = self.request_body(prompt, system);
        let response = self.send(&self.endpoint("generateContent"), &body).await?;

        let parsed = response.json::<GenerateContentResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize gemini response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        into_llm_response(parsed)
    }

    pub async fn stream(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<TextStream, ProviderError> {
        let body = self.request_body(prompt, system);
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.send(&url, &body).await?;

        Ok(sse::event_stream(response.bytes_stream(), GeminiEvents::default()))
    }
}

/// Streamed `GenerateContentResponse` chunks.
#[derive(Debug, Default)]
struct GeminiEvents {
    usage: Option<LlmUsage>,
}

impl EventParser for GeminiEvents {
    const PROVIDER: &'static str = "gemini";

    fn parse(&mut self, data: &str) -> Result<Vec<StreamPart>, ProviderError> {
        let chunk = serde_json::from_str::<GenerateContentResponse>(data)
            .map_err(|e| ProviderError::Stream(format!("malformed event: {e}")))?;
        if let Some(u) = chunk.usage_metadata.as_ref() {
            self.usage = Some(u.into());
        }
        Ok(chunk_parts(&chunk))
    }

    fn take_usage(&mut self) -> Option<LlmUsage> {
        self.usage.take()
    }
}

/// Text and reasoning deltas carried by one streamed chunk.
fn chunk_parts(chunk: &GenerateContentResponse) -> Vec<StreamPart> {
    chunk
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| {
                    let text = p.text.as_deref().filter(|t| !t.is_empty())?;
                    Some(if p.thought {
                        StreamPart::ReasoningDelta(text.to_string())
                    } else {
                        StreamPart::TextDelta(text.to_string())
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn into_llm_response(parsed: GenerateContentResponse) -> Result<LlmResponse, ProviderError> {
    let usage = parsed.usage_metadata.as_ref().map(LlmUsage::from);

    let candidate = parsed.candidates.into_iter().next().ok_or_else(|| {
        ProviderError::Request(match parsed.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => format!("prompt blocked: {reason}"),
            None => "no candidates in response".into(),
        })
    })?;

    let mut text = String::new();
    let mut reasoning: Option<String> = None;
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        let Some(t) = part.text else { continue };
        if part.thought {
            reasoning.get_or_insert_with(String::new).push_str(&t);
        } else {
            text.push_str(&t);
        }
    }

    if text.trim().is_empty() && reasoning.is_none() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(ProviderError::Request(format!(
            "empty content in response (finish reason: {reason})"
        )));
    }

    debug!(text_len = text.len(), has_reasoning = reasoning.is_some(), "received gemini response");
    Ok(LlmResponse { text, reasoning, usage })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    thought: bool,
}

impl Part {
    fn text(s: &str) -> Self {
        Self { text: Some(s.to_string()), thought: false }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    thoughts_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

impl From<&UsageMetadata> for LlmUsage {
    fn from(u: &UsageMetadata) -> Self {
        LlmUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count + u.thoughts_token_count,
            cached_input_tokens: u.cached_content_token_count,
        }
    }
}

// Error envelope used by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env.error.status.map(|s| format!(" [{s}]")).unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    }
}
