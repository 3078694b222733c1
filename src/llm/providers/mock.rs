//! Deterministic mock handles for the test environment.
//!
//! Every reply is fixed per handle and never depends on the network, the
//! clock or randomness. Usage is a whitespace word count so callers that log
//! tokens still see stable numbers.

use futures_util::stream;

use crate::llm::{LlmResponse, LlmUsage, ProviderError, StreamPart, TextStream};

/// Fixed output of a mock handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockScript {
    pub reasoning: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    model_id: String,
    script: MockScript,
}

impl MockProvider {
    pub fn new(model_id: impl Into<String>, script: MockScript) -> Self {
        Self { model_id: model_id.into(), script }
    }

    /// Plain chat replies.
    pub fn chat() -> Self {
        Self::new(
            "mock-chat",
            MockScript { reasoning: None, text: "Hello, world! This is a test response.".into() },
        )
    }

    /// Chat replies preceded by a reasoning segment.
    pub fn reasoning() -> Self {
        Self::new(
            "mock-chat-reasoning",
            MockScript {
                reasoning: Some("The user sent a test message, so a short greeting is enough.".into()),
                text: "Hello, world! This is a test response.".into(),
            },
        )
    }

    /// Conversation title generation.
    pub fn title() -> Self {
        Self::new(
            "mock-title",
            MockScript { reasoning: None, text: "This is a test title".into() },
        )
    }

    /// Document artifact generation.
    pub fn artifact() -> Self {
        Self::new(
            "mock-artifact",
            MockScript {
                reasoning: None,
                text: "# Test document\n\nThis is test artifact content.".into(),
            },
        )
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn script(&self) -> &MockScript {
        &self.script
    }

    pub async fn complete(
        &self,
        prompt: &str,
        _system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: self.script.text.clone(),
            reasoning: self.script.reasoning.clone(),
            usage: Some(self.usage(prompt)),
        })
    }

    /// Reasoning first, then the answer word by word, then `Finish`.
    pub fn stream(&self, prompt: &str, _system: Option<&str>) -> TextStream {
        let mut parts = Vec::new();
        if let Some(reasoning) = &self.script.reasoning {
            parts.extend(
                reasoning
                    .split_inclusive(' ')
                    .map(|w| StreamPart::ReasoningDelta(w.to_string())),
            );
        }
        parts.extend(
            self.script
                .text
                .split_inclusive(' ')
                .map(|w| StreamPart::TextDelta(w.to_string())),
        );
        parts.push(StreamPart::Finish { usage: Some(self.usage(prompt)) });

        Box::pin(stream::iter(parts.into_iter().map(Ok)))
    }

    fn usage(&self, prompt: &str) -> LlmUsage {
        let reasoning_words = self
            .script
            .reasoning
            .as_deref()
            .map(|r| r.split_whitespace().count())
            .unwrap_or(0);
        LlmUsage {
            input_tokens: prompt.split_whitespace().count() as u64,
            output_tokens: (self.script.text.split_whitespace().count() + reasoning_words) as u64,
            cached_input_tokens: 0,
        }
    }
}
