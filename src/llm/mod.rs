//! Language model handles and logical model routing.
//!
//! `LlmProvider` is an enum over concrete handle implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Handles are shared immutable capabilities — clone them freely.
//! Methods return boxed futures rather than being `async fn` so the
//! reasoning decorator can wrap any other variant, itself included.

pub mod providers;
pub mod reasoning;
pub mod registry;

use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

pub use reasoning::{ReasoningProvider, ReasoningSplitter, extract_reasoning};
pub use registry::{ModelId, ModelRegistry};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("unknown logical model: {0}")]
    UnknownModel(String),
    #[error("{provider} requires the {var} environment variable")]
    MissingApiKey {
        provider: &'static str,
        var: &'static str,
    },
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider stream failed: {0}")]
    Stream(String),
}

// ── Response types ──────────────────────────────────────────────────────────

/// Token usage reported by a provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_input_tokens: u64,
}

/// Result of a non-streaming completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmResponse {
    /// Final answer text.
    pub text: String,
    /// Intermediate "thinking" output, when the model produced any.
    pub reasoning: Option<String>,
    pub usage: Option<LlmUsage>,
}

/// One element of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    TextDelta(String),
    ReasoningDelta(String),
    /// Always the last part of a well-formed stream.
    Finish { usage: Option<LlmUsage> },
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamPart, ProviderError>> + Send>>;

/// Drain a stream into a single response.
pub async fn collect_stream(mut stream: TextStream) -> Result<LlmResponse, ProviderError> {
    let mut text = String::new();
    let mut reasoning: Option<String> = None;
    let mut usage = None;

    while let Some(part) = stream.next().await {
        match part? {
            StreamPart::TextDelta(t) => text.push_str(&t),
            StreamPart::ReasoningDelta(r) => reasoning.get_or_insert_with(String::new).push_str(&r),
            StreamPart::Finish { usage: u } => usage = u,
        }
    }

    Ok(LlmResponse { text, reasoning, usage })
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available model handle backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Mock(providers::mock::MockProvider),
    Gemini(providers::gemini::GeminiProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    /// Decorator: splits a `<tag>…</tag>` reasoning segment out of the
    /// wrapped handle's output.
    Reasoning(Box<ReasoningProvider>),
}

impl LlmProvider {
    /// Send `prompt` (with an optional system prompt) and return the reply.
    pub fn complete<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<LlmResponse, ProviderError>> {
        match self {
            LlmProvider::Mock(p) => Box::pin(p.complete(prompt, system)),
            LlmProvider::Gemini(p) => Box::pin(p.complete(prompt, system)),
            LlmProvider::OpenAiCompatible(p) => Box::pin(p.complete(prompt, system)),
            LlmProvider::Reasoning(p) => Box::pin(p.complete(prompt, system)),
        }
    }

    /// Like [`complete`](Self::complete) but yields the reply incrementally.
    pub fn stream<'a>(
        &'a self,
        prompt: &'a str,
        system: Option<&'a str>,
    ) -> BoxFuture<'a, Result<TextStream, ProviderError>> {
        match self {
            LlmProvider::Mock(p) => Box::pin(async move { Ok(p.stream(prompt, system)) }),
            LlmProvider::Gemini(p) => Box::pin(p.stream(prompt, system)),
            LlmProvider::OpenAiCompatible(p) => Box::pin(p.stream(prompt, system)),
            LlmProvider::Reasoning(p) => Box::pin(p.stream(prompt, system)),
        }
    }

    /// Concrete backend model name.
    pub fn model_id(&self) -> &str {
        match self {
            LlmProvider::Mock(p) => p.model_id(),
            LlmProvider::Gemini(p) => p.model_id(),
            LlmProvider::OpenAiCompatible(p) => p.model_id(),
            LlmProvider::Reasoning(p) => p.inner().model_id(),
        }
    }

    /// Short backend label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmProvider::Mock(_) => "mock",
            LlmProvider::Gemini(_) => "gemini",
            LlmProvider::OpenAiCompatible(_) => "openai",
            LlmProvider::Reasoning(_) => "reasoning",
        }
    }

    /// `true` when calling this handle never leaves the process.
    pub fn is_offline(&self) -> bool {
        match self {
            LlmProvider::Mock(_) => true,
            LlmProvider::Gemini(_) | LlmProvider::OpenAiCompatible(_) => false,
            LlmProvider::Reasoning(p) => p.inner().is_offline(),
        }
    }
}
