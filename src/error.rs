use thiserror::Error;

/// Failure taxonomy shared by every component.
#[derive(Debug, Error)]
pub enum MovieError {
    /// Retries exhausted, offline, or an unreadable response.
    #[error("network failure: {0}")]
    Network(String),

    /// The provider reported no match.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed credentials or filter input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Bad credentials, duplicate registration, expired or invalid session.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Local device storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type MovieResult<T> = Result<T, MovieError>;
