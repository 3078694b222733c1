//! Application-wide error types.

use thiserror::Error;

use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("invalid arguments: {0}")]
    Cli(String),

    #[error("model error: {0}")]
    Provider(#[from] ProviderError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_display() {
        let e = AppError::Config("missing field".into());
        assert!(e.to_string().contains("missing field"));
        assert!(e.to_string().starts_with("config error"));
    }

    #[test]
    fn logger_error_display() {
        let e = AppError::Logger("already initialized".into());
        assert!(e.to_string().contains("already initialized"));
    }

    #[test]
    fn cli_error_display() {
        let e = AppError::Cli("-m requires a model name".into());
        assert_eq!(e.to_string(), "invalid arguments: -m requires a model name");
    }

    #[test]
    fn provider_error_converts() {
        let e: AppError = ProviderError::UnknownModel("draft-model".into()).into();
        assert!(e.to_string().contains("draft-model"));
        assert!(e.source().is_some());
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let e: AppError = io_err.into();
        assert!(e.to_string().contains("io error"));
        let _: &dyn Error = &e;
    }
}
