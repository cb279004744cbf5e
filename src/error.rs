use thiserror::Error;
use validator::ValidationErrors;

use crate::dao::{credentials::CredentialError, remote::RemoteError};

/// Errors returned by store commands and the services built on them.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Bad input shape or value (empty name, unknown player, negative score...).
    #[error("invalid input: {0}")]
    Validation(String),
    /// Unknown session or game id.
    #[error("not found: {0}")]
    NotFound(String),
    /// Command not allowed for the current session status.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Remote collaborator failed while no local change was pending.
    #[error("remote failure: {0}")]
    Remote(#[from] RemoteError),
    /// Persisted credentials could not be read or written.
    #[error("credential storage failure: {0}")]
    Credentials(#[from] CredentialError),
}

impl From<ValidationErrors> for ScoreError {
    fn from(err: ValidationErrors) -> Self {
        ScoreError::Validation(format!("validation failed: {}", err))
    }
}

impl ScoreError {
    /// True for the synchronous, local error kinds that block a command.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ScoreError::Validation(_) | ScoreError::NotFound(_) | ScoreError::InvalidState(_)
        )
    }
}
