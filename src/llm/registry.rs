//! Logical model routing.
//!
//! A [`ModelRegistry`] maps the four fixed logical names to handles. It is
//! built once at startup from [`Config`] and then only read, so callers share
//! it behind an `Arc` (or a plain reference) without locking.
//!
//! Which handle set is installed depends on [`Environment`] alone; the set of
//! logical names never changes.

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::config::{ApiKeys, Config, Environment, LlmConfig};
use crate::llm::providers::{self, mock::MockProvider};
use crate::llm::{LlmProvider, ProviderError, ReasoningProvider};

/// Stable role identifier, independent of the backend model behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelId {
    Chat,
    ChatReasoning,
    Title,
    Artifact,
}

impl ModelId {
    pub const ALL: [ModelId; 4] =
        [ModelId::Chat, ModelId::ChatReasoning, ModelId::Title, ModelId::Artifact];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Chat => "chat-model",
            ModelId::ChatReasoning => "chat-model-reasoning",
            ModelId::Title => "title-model",
            ModelId::Artifact => "artifact-model",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ModelId::ALL.into_iter().find(|id| id.as_str() == s)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::parse(s).ok_or_else(|| ProviderError::UnknownModel(s.to_string()))
    }
}

/// Read-only mapping from logical model names to handles.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    environment: Environment,
    chat: LlmProvider,
    chat_reasoning: LlmProvider,
    title: LlmProvider,
    artifact: LlmProvider,
}

impl ModelRegistry {
    /// Install the handle set for `environment`.
    ///
    /// Test installs deterministic mocks and never touches `llm` or `keys`.
    /// Production builds one provider-backed handle per logical name and
    /// wraps `chat-model-reasoning` in the reasoning decorator.
    pub fn new(
        environment: Environment,
        llm: &LlmConfig,
        keys: &ApiKeys,
    ) -> Result<Self, ProviderError> {
        let registry = match environment {
            Environment::Test => Self::test(),
            Environment::Production => {
                let handle = |id: ModelId| providers::build(llm, keys, llm.backend_model(id));
                let reasoning = ReasoningProvider::new(
                    handle(ModelId::ChatReasoning)?,
                    llm.reasoning_tag.clone(),
                );
                Self {
                    environment,
                    chat: handle(ModelId::Chat)?,
                    chat_reasoning: LlmProvider::Reasoning(Box::new(reasoning)),
                    title: handle(ModelId::Title)?,
                    artifact: handle(ModelId::Artifact)?,
                }
            }
        };

        info!(
            environment = %registry.environment,
            models = ?registry.iter().map(|(id, p)| (id.as_str(), p.model_id())).collect::<Vec<_>>(),
            "model registry ready"
        );
        Ok(registry)
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Self::new(config.environment, &config.llm, &config.api_keys)
    }

    /// Deterministic offline handle set.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            chat: LlmProvider::Mock(MockProvider::chat()),
            chat_reasoning: LlmProvider::Mock(MockProvider::reasoning()),
            title: LlmProvider::Mock(MockProvider::title()),
            artifact: LlmProvider::Mock(MockProvider::artifact()),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn get(&self, id: ModelId) -> &LlmProvider {
        match id {
            ModelId::Chat => &self.chat,
            ModelId::ChatReasoning => &self.chat_reasoning,
            ModelId::Title => &self.title,
            ModelId::Artifact => &self.artifact,
        }
    }

    /// Look a handle up by its logical name string.
    pub fn language_model(&self, name: &str) -> Result<&LlmProvider, ProviderError> {
        match ModelId::parse(name) {
            Some(id) => Ok(self.get(id)),
            None => {
                warn!(name, "lookup of unregistered logical model");
                Err(ProviderError::UnknownModel(name.to_string()))
            }
        }
    }

    /// All entries, in [`ModelId::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &LlmProvider)> + '_ {
        ModelId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn production_config() -> Config {
        let mut cfg = Config::test_default();
        cfg.environment = Environment::Production;
        cfg.api_keys = ApiKeys { gemini: Some("fake-key".into()), openai: None };
        cfg
    }

    #[test]
    fn model_id_names_round_trip() {
        for id in ModelId::ALL {
            assert_eq!(id.as_str().parse::<ModelId>().unwrap(), id);
        }
        assert!(matches!("gpt-4".parse::<ModelId>(), Err(ProviderError::UnknownModel(_))));
    }

    #[test]
    fn test_set_is_offline_mocks() {
        let reg = ModelRegistry::test();
        assert_eq!(reg.environment(), Environment::Test);
        for (_, p) in reg.iter() {
            assert_eq!(p.kind(), "mock");
            assert!(p.is_offline());
        }
    }

    #[test]
    fn test_handles_are_distinct() {
        let reg = ModelRegistry::test();
        let mut ids: Vec<_> = reg.iter().map(|(_, p)| p.model_id().to_string()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn production_wraps_reasoning_model() {
        let reg = ModelRegistry::from_config(&production_config()).unwrap();
        assert_eq!(reg.environment(), Environment::Production);
        assert_eq!(reg.get(ModelId::Chat).kind(), "gemini");
        assert_eq!(reg.get(ModelId::Title).kind(), "gemini");
        assert_eq!(reg.get(ModelId::Artifact).kind(), "gemini");
        match reg.get(ModelId::ChatReasoning) {
            LlmProvider::Reasoning(r) => {
                assert_eq!(r.tag(), "think");
                assert_eq!(r.inner().kind(), "gemini");
            }
            other => panic!("expected reasoning decorator, got {}", other.kind()),
        }
        assert!(reg.iter().all(|(_, p)| !p.is_offline()));
    }

    #[test]
    fn production_uses_overrides() {
        let mut cfg = production_config();
        cfg.llm.model_overrides.insert(ModelId::Title, "gemini-2.5-flash-lite".into());
        let reg = ModelRegistry::from_config(&cfg).unwrap();
        assert_eq!(reg.get(ModelId::Title).model_id(), "gemini-2.5-flash-lite");
        assert_eq!(reg.get(ModelId::Chat).model_id(), "test-model");
    }

    #[test]
    fn production_without_key_fails() {
        let mut cfg = production_config();
        cfg.api_keys = ApiKeys::default();
        let err = ModelRegistry::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey { .. }));
    }

    #[test]
    fn test_environment_ignores_missing_keys() {
        let cfg = Config::test_default();
        assert!(ModelRegistry::from_config(&cfg).is_ok());
    }

    #[test]
    fn lookup_by_name() {
        let reg = ModelRegistry::test();
        assert_eq!(reg.language_model("title-model").unwrap().model_id(), "mock-title");
        let err = reg.language_model("missing-model").unwrap_err();
        assert!(err.to_string().contains("missing-model"));
    }

    #[test]
    fn same_names_in_both_environments() {
        let test: Vec<_> = ModelRegistry::test().iter().map(|(id, _)| id).collect();
        let prod: Vec<_> = ModelRegistry::from_config(&production_config())
            .unwrap()
            .iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(test, prod);
        assert_eq!(test, ModelId::ALL.to_vec());
    }
}
