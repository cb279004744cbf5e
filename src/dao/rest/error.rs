//! Error types shared by the REST client implementation.

use reqwest::StatusCode;
use thiserror::Error;

use crate::dao::remote::RemoteError;

/// Convenient result alias returning [`RestError`] failures.
pub type RestResult<T> = Result<T, RestError>;

/// Failures that can occur while talking to the stats REST API.
#[derive(Debug, Error)]
pub enum RestError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build REST client")]
    ClientBuilder {
        /// Builder failure.
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out.
    #[error("failed to send request to `{path}`")]
    RequestSend {
        /// Request path relative to the API base.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// The API returned an unexpected status code.
    #[error("unexpected response status {status} for `{path}`")]
    RequestStatus {
        /// Request path relative to the API base.
        path: String,
        /// Status returned by the API.
        status: StatusCode,
    },
    /// Response payload could not be decoded into the expected model.
    #[error("failed to decode response for `{path}`")]
    DecodeResponse {
        /// Request path relative to the API base.
        path: String,
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
}

impl From<RestError> for RemoteError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::RequestStatus { status, .. }
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                RemoteError::Unauthorized
            }
            RestError::RequestStatus { path, status } => RemoteError::Rejected {
                path,
                status: status.as_u16(),
            },
            other => RemoteError::unavailable(other.to_string(), other),
        }
    }
}
