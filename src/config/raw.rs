//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use std::collections::HashMap;

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub app: RawApp,
    #[serde(default)]
    pub llm: RawLlm,
}

#[derive(Deserialize)]
pub(super) struct RawApp {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for RawApp {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_reasoning_tag")]
    pub reasoning_tag: String,
    #[serde(default)]
    pub gemini: RawGeminiConfig,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
    /// `[llm.models]` — logical name -> backend model.
    #[serde(default)]
    pub models: HashMap<String, String>,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            reasoning_tag: default_reasoning_tag(),
            gemini: RawGeminiConfig::default(),
            openai: RawOpenAiConfig::default(),
            models: HashMap::new(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            temperature: default_gemini_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// ── Defaults ────────────────────────────────────────────────────────────────

pub(super) fn default_app_name() -> String { "s2-assistant".to_string() }
pub(super) fn default_log_level() -> String { "info".to_string() }
pub(super) fn default_environment() -> String { "production".to_string() }
pub(super) fn default_llm_provider() -> String { "gemini".to_string() }
pub(super) fn default_reasoning_tag() -> String { "think".to_string() }
pub(super) fn default_gemini_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
pub(super) fn default_gemini_model() -> String { "gemini-2.5-flash-lite".to_string() }
pub(super) fn default_gemini_temperature() -> f32 { 0.7 }
pub(super) fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
pub(super) fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
pub(super) fn default_openai_temperature() -> f32 { 0.2 }
pub(super) fn default_timeout_seconds() -> u64 { 60 }
