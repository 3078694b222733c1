//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `S2_ASSISTANT_LOG_LEVEL` and `S2_ASSISTANT_ENV` overrides.
//! API keys are read from the environment only.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs (`Config`, `LlmConfig`, …).
//! - **raw** — Raw TOML deserialization types; kept private.
//! - **load** — Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `environment_override`.

mod load;
mod raw;
mod types;

pub use load::{environment_override, load, load_from};
pub use types::*;

impl Config {
    /// Safe `Config` for tests — test environment, no API keys, no external calls.
    pub fn test_default() -> Self {
        Self {
            app_name: "test".into(),
            log_level: "info".into(),
            environment: Environment::Test,
            llm: LlmConfig {
                provider: raw::default_llm_provider(),
                reasoning_tag: raw::default_reasoning_tag(),
                gemini: GeminiConfig {
                    api_base_url: "http://localhost:0/v1beta".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
                model_overrides: std::collections::HashMap::new(),
            },
            api_keys: ApiKeys::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelId;
    use std::io::Write;
    use std::path::Path;
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[app]
name = "test-app"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.app_name, "test-app");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.environment, Environment::Production);
    }

    #[test]
    fn defaults_match_hosted_setup() {
        let f = write_toml("");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.gemini.model, "gemini-2.5-flash-lite");
        assert_eq!(cfg.llm.reasoning_tag, "think");
        assert!(cfg.llm.model_overrides.is_empty());
    }

    #[test]
    fn parse_test_environment() {
        let f = write_toml("[app]\nenvironment = \"test\"\n");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(cfg.environment.is_test());
    }

    #[test]
    fn invalid_environment_errors() {
        let f = write_toml("[app]\nenvironment = \"staging\"\n");
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("invalid environment"));
    }

    #[test]
    fn unknown_provider_errors() {
        let f = write_toml("[llm]\ndefault = \"carrier-pigeon\"\n");
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("unknown llm provider"));
    }

    #[test]
    fn empty_reasoning_tag_errors() {
        let f = write_toml("[llm]\nreasoning_tag = \" \"\n");
        assert!(load_from(f.path(), None, None).is_err());
    }

    #[test]
    fn model_overrides_parsed() {
        let toml = r#"
[llm.models]
title-model = "gemini-2.0-flash"
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.llm.backend_model(ModelId::Title), "gemini-2.0-flash");
        assert_eq!(cfg.llm.backend_model(ModelId::Chat), "gemini-2.5-flash-lite");
    }

    #[test]
    fn unknown_model_override_errors() {
        let f = write_toml("[llm.models]\nsummary-model = \"x\"\n");
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("summary-model"));
    }

    #[test]
    fn backend_model_follows_provider() {
        let f = write_toml("[llm]\ndefault = \"openai\"\n\n[llm.openai]\nmodel = \"gpt-x\"\n");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.llm.backend_model(ModelId::ChatReasoning), "gpt-x");
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug"), None).unwrap();
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn environment_override_wins_over_file() {
        let f = write_toml("[app]\nenvironment = \"production\"\n");
        let cfg = load_from(f.path(), None, Some(Environment::Test)).unwrap();
        assert_eq!(cfg.environment, Environment::Test);
    }

    #[test]
    fn env_lookup_explicit_value() {
        let env = environment_override(|name| {
            (name == "S2_ASSISTANT_ENV").then(|| "prod".to_string())
        })
        .unwrap();
        assert_eq!(env, Some(Environment::Production));
    }

    #[test]
    fn env_lookup_test_runner_vars() {
        let env = environment_override(|name| (name == "PLAYWRIGHT").then(|| "1".to_string()))
            .unwrap();
        assert_eq!(env, Some(Environment::Test));
    }

    #[test]
    fn env_lookup_explicit_beats_runner() {
        let env = environment_override(|name| match name {
            "S2_ASSISTANT_ENV" => Some("production".into()),
            "CI_PLAYWRIGHT" => Some("true".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(env, Some(Environment::Production));
    }

    #[test]
    fn env_lookup_nothing_set() {
        assert_eq!(environment_override(|_| None).unwrap(), None);
    }

    #[test]
    fn env_lookup_invalid_value_errors() {
        let result = environment_override(|name| {
            (name == "S2_ASSISTANT_ENV").then(|| "qa".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn api_keys_are_redacted_in_debug() {
        let keys = ApiKeys { gemini: Some("secret-key".into()), openai: None };
        let dbg = format!("{keys:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("redacted"));
    }

    const BASE_TOML: &str = r#"
[app]
name = "base-app"
log_level = "info"

[llm]
default = "gemini"

[llm.gemini]
model = "gemini-base"
temperature = 0.1
timeout_seconds = 30
"#;

    fn write_named(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn overlay_keeps_base_fields() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[app]
log_level = "debug"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, None, None).unwrap();
        assert_eq!(cfg.app_name, "base-app");
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn overlay_wins_scalar() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[llm.gemini]
model = "gemini-overlay"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, None, None).unwrap();
        assert_eq!(cfg.llm.gemini.model, "gemini-overlay");
        assert_eq!(cfg.llm.gemini.temperature, 0.1);
    }

    #[test]
    fn missing_base_errors() {
        let dir = TempDir::new().unwrap();
        let overlay = "[meta]\nbase = \"nonexistent.toml\"\n";
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let msg = load_from(&overlay_path, None, None).unwrap_err().to_string();
        assert!(msg.contains("cannot read"));
    }

    #[test]
    fn cycle_detection() {
        let dir = TempDir::new().unwrap();
        let self_path = dir.path().join("self.toml");
        let content = format!("[meta]\nbase = \"{}\"\n\n{BASE_TOML}", self_path.display());
        std::fs::write(&self_path, content).unwrap();
        let msg = load_from(&self_path, None, None).unwrap_err().to_string();
        assert!(msg.contains("circular"));
    }
}
