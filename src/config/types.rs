//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs that the rest of the crate
//! consumes. Raw TOML deserialization types live in `raw.rs`.

use std::collections::HashMap;
use std::fmt;

use crate::llm::ModelId;

/// Which model set the registry installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Deterministic offline handles, no network access.
    Test,
    /// Provider-backed handles.
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    /// Accepts `test`, `production` and their short forms.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "testing" => Some(Environment::Test),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Environment::Test)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Google Gemini provider configuration (`[llm.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, without the `/models/...` suffix.
    pub api_base_url: String,
    /// Backend model used for every logical name unless overridden.
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// Model routing configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Backend for the production set (`"gemini"` or `"openai"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    /// Tag delimiting the reasoning segment for `chat-model-reasoning`.
    pub reasoning_tag: String,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
    /// Per-logical-name backend model overrides (`[llm.models]`).
    pub model_overrides: HashMap<ModelId, String>,
}

impl LlmConfig {
    /// Backend model name the configured provider should use for `id`.
    pub fn backend_model(&self, id: ModelId) -> &str {
        if let Some(model) = self.model_overrides.get(&id) {
            return model;
        }
        match self.provider.as_str() {
            "openai" | "openai-compatible" => &self.openai.model,
            _ => &self.gemini.model,
        }
    }
}

/// API keys, sourced from the environment only — never from TOML.
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `GOOGLE_GENERATIVE_AI_API_KEY`
    pub gemini: Option<String>,
    /// `LLM_API_KEY` — `None` for keyless local OpenAI-compatible servers.
    pub openai: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &self.gemini.as_ref().map(|_| "<redacted>"))
            .field("openai", &self.openai.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub log_level: String,
    pub environment: Environment,
    pub llm: LlmConfig,
    pub api_keys: ApiKeys,
}
