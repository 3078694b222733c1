//! LLM provider implementations.
//!
//! `build(config, keys, model)` is the factory, called once per logical
//! model name at startup. Adding a new backend = new module + new match arm.

pub mod gemini;
pub mod mock;
pub mod openai_compatible;
mod sse;

use tracing::{debug, error};

use crate::config::{ApiKeys, LlmConfig};
use crate::llm::{LlmProvider, ProviderError};

/// Construct a provider-backed handle for the backend model `model`.
///
/// Keys come from [`ApiKeys`] (environment only, never TOML). Gemini
/// requires a key; OpenAI-compatible servers may be keyless.
pub fn build(config: &LlmConfig, keys: &ApiKeys, model: &str) -> Result<LlmProvider, ProviderError> {
    debug!(provider = %config.provider, model, "building llm provider");
    match config.provider.as_str() {
        "gemini" => {
            let g = &config.gemini;
            let api_key = keys.gemini.clone().ok_or(ProviderError::MissingApiKey {
                provider: "gemini",
                var: "GOOGLE_GENERATIVE_AI_API_KEY",
            })?;
            let p = gemini::GeminiProvider::new(
                g.api_base_url.clone(),
                model.to_string(),
                g.temperature,
                g.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::Gemini(p))
        }
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                model.to_string(),
                oai.temperature,
                oai.timeout_seconds,
                keys.openai.clone(),
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

/// Return `response` unchanged if successful, otherwise consume its body and
/// turn it into a `Request` error using the provider's `error_message`.
async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
    error_message: fn(reqwest::StatusCode, &str) -> String,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(status, &body);
    error!(provider, %status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}
