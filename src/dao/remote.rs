use std::error::Error;
use thiserror::Error;

/// Result alias for remote collaborator calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error raised by remote collaborators regardless of the transport behind them.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a usable response.
    #[error("remote unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Transport failure behind it.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The remote answered with a non-success status.
    #[error("remote rejected `{path}` with status {status}")]
    Rejected {
        /// Request path relative to the API base.
        path: String,
        /// HTTP status code.
        status: u16,
    },
    /// The remote refused the credentials (or none were attached).
    #[error("not authenticated")]
    Unauthorized,
}

impl RemoteError {
    /// Construct an unavailable error from any transport failure.
    pub fn unavailable(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        RemoteError::Unavailable {
            message: message.into(),
            source: Box::new(source),
        }
    }
}
