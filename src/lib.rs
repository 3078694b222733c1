//! S2 assistant core: system prompt composition and logical model routing.
//!
//! - [`prompts`] builds the system and document-update prompts.
//! - [`llm`] holds the model handles and the [`llm::ModelRegistry`].
//! - [`config`] loads the TOML configuration the registry is built from.

pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod prompts;
