//! Error types for `signage-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

/// Unified error type for all core operations.
///
/// The first three variants form the user-facing taxonomy: bad input,
/// rejected credentials or tokens, and failed writes. None of them is fatal
/// to the process; the HTTP layer turns each into a message for the operator.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Bad input: unsupported format, oversized file, malformed payload.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials, expired session or invalid anti-forgery token.
    #[error("{0}")]
    Auth(String),

    /// A storage read or write failed.
    #[error("storage error: {0}")]
    Persistence(String),

    /// The requested record or file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failed to parse a configuration or legacy data file.
    #[error("parse error: {0}")]
    ConfigParse(String),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        CoreError::Persistence(format!("migration failed: {e}"))
    }
}

/// Convenience alias used throughout `signage-core`.
pub type CoreResult<T> = Result<T, CoreError>;
