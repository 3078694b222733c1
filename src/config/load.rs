//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `S2_ASSISTANT_LOG_LEVEL` / `S2_ASSISTANT_ENV` overrides.

use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::AppError;
use crate::llm::ModelId;

use super::raw::RawConfig;
use super::types::*;

/// Env vars whose presence alone selects the test environment, as set by
/// the end-to-end test runner.
const TEST_RUNNER_VARS: [&str; 3] = ["PLAYWRIGHT_TEST_BASE_URL", "PLAYWRIGHT", "CI_PLAYWRIGHT"];

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Resolve the environment override from a variable lookup.
///
/// An explicit `S2_ASSISTANT_ENV` wins; otherwise any test-runner variable
/// selects [`Environment::Test`]. Returns `None` when nothing is set.
pub fn environment_override<F>(lookup: F) -> Result<Option<Environment>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("S2_ASSISTANT_ENV") {
        return Environment::parse(&value)
            .map(Some)
            .ok_or_else(|| AppError::Config(format!("invalid S2_ASSISTANT_ENV: '{value}'")));
    }
    let runner = TEST_RUNNER_VARS
        .iter()
        .any(|name| lookup(name).is_some_and(|v| !v.is_empty()));
    Ok(runner.then_some(Environment::Test))
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, built-in defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("S2_ASSISTANT_LOG_LEVEL").ok();
    let environment = environment_override(|name| env::var(name).ok())?;

    if let Some(path) = config_path {
        return load_from(Path::new(path), log_level_override.as_deref(), environment);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, log_level_override.as_deref(), environment)
    } else {
        resolve(
            RawConfig::default(),
            Path::new("<built-in defaults>"),
            log_level_override.as_deref(),
            environment,
        )
    }
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    environment_override: Option<Environment>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    resolve(parsed, path, log_level_override, environment_override)
}

fn resolve(
    parsed: RawConfig,
    source: &Path,
    log_level_override: Option<&str>,
    environment_override: Option<Environment>,
) -> Result<Config, AppError> {
    let app = parsed.app;
    let llm = parsed.llm;

    let environment = match environment_override {
        Some(env) => env,
        None => Environment::parse(&app.environment).ok_or_else(|| {
            AppError::Config(format!(
                "invalid environment '{}' in {}",
                app.environment,
                source.display()
            ))
        })?,
    };

    match llm.provider.as_str() {
        "gemini" | "openai" | "openai-compatible" => {}
        other => {
            return Err(AppError::Config(format!(
                "unknown llm provider '{other}' in {}",
                source.display()
            )));
        }
    }

    if llm.reasoning_tag.trim().is_empty() {
        return Err(AppError::Config("llm.reasoning_tag must not be empty".into()));
    }

    let mut model_overrides = HashMap::new();
    for (name, model) in llm.models {
        let id: ModelId = name.parse().map_err(|_| {
            AppError::Config(format!(
                "unknown logical model '{name}' in [llm.models] of {}",
                source.display()
            ))
        })?;
        model_overrides.insert(id, model);
    }

    debug!(
        source = %source.display(),
        environment = %environment,
        provider = %llm.provider,
        overrides = model_overrides.len(),
        "config resolved"
    );

    Ok(Config {
        app_name: app.name,
        log_level: log_level_override.unwrap_or(&app.log_level).to_string(),
        environment,
        llm: LlmConfig {
            provider: llm.provider,
            reasoning_tag: llm.reasoning_tag.trim().to_string(),
            gemini: GeminiConfig {
                api_base_url: llm.gemini.api_base_url,
                model: llm.gemini.model,
                temperature: llm.gemini.temperature,
                timeout_seconds: llm.gemini.timeout_seconds,
            },
            openai: OpenAiConfig {
                api_base_url: llm.openai.api_base_url,
                model: llm.openai.model,
                temperature: llm.openai.temperature,
                timeout_seconds: llm.openai.timeout_seconds,
            },
            model_overrides,
        },
        api_keys: ApiKeys {
            gemini: env::var("GOOGLE_GENERATIVE_AI_API_KEY").ok(),
            openai: env::var("LLM_API_KEY").ok(),
        },
    })
}
