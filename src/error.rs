// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MirrorError>;

/// The external git step that produced a [`MirrorError::Transfer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Clone,
    Push,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStage::Clone => write!(f, "clone"),
            TransferStage::Push => write!(f, "push"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Repository listing failed: {0}")]
    Upstream(String),

    #[error("Mirror {stage} failed (exit code {}): {stderr}", display_exit_code(.exit_code))]
    Transfer {
        stage: TransferStage,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("State store error: {0}")]
    State(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn display_exit_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl MirrorError {
    /// Errors that abort a whole run. Everything else is recovered per
    /// (repository, destination) pair.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MirrorError::Configuration(_) | MirrorError::Authentication(_) | MirrorError::Upstream(_)
        )
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(MirrorError::Configuration("x".into()).is_fatal());
        assert!(MirrorError::Upstream("x".into()).is_fatal());
        assert!(MirrorError::Authentication("x".into()).is_fatal());

        let transfer = MirrorError::Transfer {
            stage: TransferStage::Clone,
            exit_code: Some(128),
            stderr: "fatal: repository not found".into(),
        };
        assert!(!transfer.is_fatal());
        assert!(!MirrorError::InvalidUrl("ssh://x".into()).is_fatal());
    }

    #[test]
    fn test_transfer_display() {
        let err = MirrorError::Transfer {
            stage: TransferStage::Push,
            exit_code: None,
            stderr: "timed out".into(),
        };
        assert_eq!(
            err.to_string(),
            "Mirror push failed (exit code none): timed out"
        );
    }
}
