//! Error types for threadroute

use crate::llm::ProviderKind;
use thiserror::Error;

/// Result type alias using RouteError
pub type Result<T> = std::result::Result<T, RouteError>;

/// Error type alias for convenience
pub type Error = RouteError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for threadroute
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider '{0}' is not configured")]
    ProviderNotConfigured(ProviderKind),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RouteError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ThreadNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) | Self::ProviderNotConfigured(_) => {
                exit_codes::INVALID_INPUT
            }
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Errors that must reach the caller of `process_query` instead of being
    /// folded into a degraded response.
    pub fn is_boundary_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Io(_)
                | Self::Persistence(_)
                | Self::Serialization(_)
                | Self::Yaml(_)
                | Self::Config(_)
                | Self::ProviderNotConfigured(_)
                | Self::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            RouteError::ThreadNotFound("t".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            RouteError::ProviderNotConfigured(ProviderKind::OpenAi).exit_code(),
            exit_codes::INVALID_INPUT
        );
        assert_eq!(
            RouteError::Llm("boom".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }

    #[test]
    fn test_boundary_failures() {
        assert!(RouteError::Persistence("disk full".into()).is_boundary_failure());
        assert!(RouteError::Config("bad".into()).is_boundary_failure());
        assert!(!RouteError::Llm("rate limited".into()).is_boundary_failure());
        assert!(!RouteError::Timeout(10).is_boundary_failure());
        assert!(!RouteError::Embedding("down".into()).is_boundary_failure());
    }

    #[test]
    fn test_provider_not_configured_display() {
        let err = RouteError::ProviderNotConfigured(ProviderKind::OpenAi);
        assert_eq!(err.to_string(), "Provider 'openai' is not configured");
    }
}
