// src/infra/errors.rs — Error types for quicken

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuickenError {
    // Provider errors (retriable depending on cause)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    /// The backend answered but the response carried no usable candidate.
    #[error("Empty completion from '{provider}'")]
    EmptyCompletion { provider: String },

    // Fatal: a required static resource (prompt examples, run config) is
    // missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    // Fatal: checkpoint or output write failed. No partial-write recovery.
    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset line {line} is not a valid record: {source}")]
    Dataset {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Evaluator '{command}' exited with {status}")]
    Evaluator { command: String, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuickenError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            QuickenError::Provider {
                retriable: true,
                ..
            } | QuickenError::RateLimited { .. }
                | QuickenError::EmptyCompletion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_provider_error() {
        let err = QuickenError::Provider {
            provider: "openai".into(),
            message: "HTTP 500".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_non_retriable_provider_error() {
        let err = QuickenError::Provider {
            provider: "openai".into(),
            message: "HTTP 400".into(),
            retriable: false,
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_rate_limited_is_retriable() {
        let err = QuickenError::RateLimited {
            provider: "openai".into(),
            retry_after_ms: 5000,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_empty_completion_is_retriable() {
        let err = QuickenError::EmptyCompletion {
            provider: "openai".into(),
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = QuickenError::Config("prompt examples file missing".into());
        assert!(!err.is_retriable());
        assert_eq!(
            err.to_string(),
            "Configuration error: prompt examples file missing"
        );
    }
}
