//! Error types for keystash.
//!
//! Every fallible operation in the library returns [`Result`]. Engine
//! failures keep their `rusqlite` source so callers can inspect them, and
//! constraint failures are lifted into their own variant.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Store errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Value could not be serialized.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Stored bytes are corrupt or do not match the requested type.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Key has no record.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// A uniqueness or other table constraint rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Underlying SQLite failure (I/O, busy, corrupt file, ...).
    #[error("storage error in {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Caller supplied invalid arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection mutex was poisoned by a panicking thread.
    #[error("database lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking task spawned by an async wrapper failed to join.
    #[error("background task failed: {0}")]
    Task(String),
}

impl Error {
    /// Create a storage error, lifting constraint failures into
    /// [`Error::ConstraintViolation`].
    pub fn storage(context: impl Into<String>, source: rusqlite::Error) -> Self {
        let context = context.into();
        if source.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            return Self::ConstraintViolation(format!("{context}: {source}"));
        }
        Self::Storage { context, source }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a key not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for storage errors caused by lock contention.
    ///
    /// The store never retries on its own; this lets callers decide.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Storage { source, .. } => matches!(
                source.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    /// Returns true if this is a [`Error::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// `anyhow`-style context helpers for `rusqlite` results.
pub(crate) trait ResultExt<T> {
    /// Wrap the engine error with a static context message.
    fn context(self, context: &'static str) -> Result<T>;

    /// Wrap the engine error with a lazily built context message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|e| Error::storage(context, e))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| Error::storage(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_constraint_failure_is_lifted() {
        let err = Error::storage("rename", sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }

    #[test]
    fn test_busy_is_transient() {
        let err = Error::storage("set", sqlite_failure(rusqlite::ffi::SQLITE_BUSY));
        assert!(err.is_transient());
        assert!(!Error::validation("bad page").is_transient());
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("user:1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "key not found: user:1");
    }
}
