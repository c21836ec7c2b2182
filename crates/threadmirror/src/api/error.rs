//! Remote platform API error types.

use thiserror::Error;

/// Errors that can occur when talking to the platform API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The response did not have the expected shape.
    #[error("Malformed API response: {0}")]
    Malformed(String),

    /// The server redirected a listing fetch; the reference is not a
    /// document link.
    #[error("Redirected fetching \"{0}\"")]
    Redirect(String),

    /// The remote rejected a post or edit submission.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// Credentials missing or token acquisition failed.
    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    /// Whether this failure is transient: logged, treated as "no result"
    /// and retried on the next natural pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Http(_) | ApiError::Malformed(_))
    }
}
