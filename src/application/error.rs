use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError, purge::PurgeError};

/// Process exit status for every failed command.
pub const FAILURE_EXIT_CODE: i32 = 1;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Purge(#[from] PurgeError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Remote-host failures never reach this type, so every variant maps to
    /// the generic failure status.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Purge(_)
            | AppError::Config(_)
            | AppError::Infra(_)
            | AppError::Validation(_)
            | AppError::Unexpected(_) => FAILURE_EXIT_CODE,
        }
    }

    /// Short category used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Purge(PurgeError::UnknownBackend(_)) => "unknown_backend",
            AppError::Purge(_) => "purge",
            AppError::Config(_) => "configuration",
            AppError::Infra(InfraError::Telemetry(_)) => "telemetry",
            AppError::Infra(_) => "infrastructure",
            AppError::Validation(_) => "validation",
            AppError::Unexpected(_) => "unexpected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_backend_is_a_generic_failure() {
        let error = AppError::from(PurgeError::UnknownBackend("varnish".to_string()));

        assert_eq!(error.exit_code(), 1);
        assert_eq!(error.kind(), "unknown_backend");
        assert!(error.to_string().contains("varnish"));
    }

    #[test]
    fn validation_message_is_preserved() {
        let error = AppError::validation("no cache backend is enabled");

        assert_eq!(error.exit_code(), FAILURE_EXIT_CODE);
        assert_eq!(
            error.to_string(),
            "validation failed: no cache backend is enabled"
        );
    }
}
