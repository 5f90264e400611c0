use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed operator shape, unsupported operator combination, or a
    /// filter nested deeper than the configured limit.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Bind value outside the supported set, or an ordering operator
    /// applied to a field whose type has no ordering.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns a stable error code for this error variant.
    /// These codes are stable and can be used by clients for error classification.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidQuery(_) => "INVALID_QUERY",
            Error::TypeMismatch(_) => "TYPE_MISMATCH",
            Error::InvalidSchema(_) => "INVALID_SCHEMA",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON_ERROR",
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Translation is deterministic: the same input fails the same way every
    /// time, so none of these errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::InvalidQuery(_) => false,
            Error::TypeMismatch(_) => false,
            Error::InvalidSchema(_) => false,
            Error::InvalidConfig(_) => false,
            Error::Json(_) => false,
        }
    }

    /// Adds context to an error while keeping its variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use docsql_core::Error;
    ///
    /// let err = Error::InvalidQuery("$index requires an object".into())
    ///     .with_context("field 'tags'");
    /// assert_eq!(err.to_string(), "Invalid query: field 'tags': $index requires an object");
    /// ```
    pub fn with_context(self, context: &str) -> Error {
        match self {
            Error::InvalidQuery(msg) => Error::InvalidQuery(format!("{}: {}", context, msg)),
            Error::TypeMismatch(msg) => Error::TypeMismatch(format!("{}: {}", context, msg)),
            Error::InvalidSchema(msg) => Error::InvalidSchema(format!("{}: {}", context, msg)),
            Error::InvalidConfig(msg) => Error::InvalidConfig(format!("{}: {}", context, msg)),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
