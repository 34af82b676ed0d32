//! Error types for the delivery core.

use std::fmt;

/// Result type for every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the delivery core.
///
/// Domain failures (`NotFound`, `Conflict`) are raised where they are
/// detected and travel unmodified to the boundary. Everything a caller
/// cannot act on collapses into [`ErrorKind::Unexpected`].
#[derive(Debug, Clone)]
pub enum Error {
    /// A referenced identifier is absent from its store.
    ///
    /// Raised by:
    /// - `CustomerService::get` / `find_entity`
    /// - `ProductService::get` / `find_entity`
    /// - every `OrderProcessor` operation that loads an order or resolves
    ///   a customer/product reference
    NotFound(String),

    /// A uniqueness rule was violated.
    ///
    /// Currently only duplicate customer email, either caught by the
    /// service pre-check or reported by the store on insert.
    Conflict(String),

    /// Request rejected as unprocessable.
    ///
    /// Shape failures (blank fields, price outside `NUMERIC(19, 2)`,
    /// quantity out of range) come from the HTTP collaborator only. The
    /// order processor raises it for a total that does not fit a `Decimal`.
    ValidationError(String),

    /// Serialization failed when converting a value to cache bytes.
    SerializationError(String),

    /// Cache bytes could not be decoded.
    ///
    /// **Recovery:** the cache layer evicts the entry and recomputes.
    DeserializationError(String),

    /// Cache entry envelope is invalid: bad magic or a key stamp that does
    /// not match the key it was read from.
    ///
    /// **Recovery:** the cache layer evicts the entry and recomputes.
    InvalidCacheEntry(String),

    /// Schema version mismatch between code and cached data.
    ///
    /// Expected during deployments; the entry is evicted and recomputed.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from cached entry)
        found: u32,
    },

    /// Cache backend error.
    BackendError(String),

    /// Persistent store error (connection lost, query failure, ...).
    StoreError(String),

    /// Configuration error during start-up.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

/// Client-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    Unexpected,
}

impl Error {
    /// Build a `NotFound` error for an entity label such as `"Customer"`.
    pub fn not_found(entity: &str) -> Self {
        Error::NotFound(format!("{} not found", entity))
    }

    /// Classify this error into the client-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::ValidationError(_) => ErrorKind::Invalid,
            _ => ErrorKind::Unexpected,
        }
    }

    /// True for errors that describe an undecodable cache entry.
    ///
    /// The cache layer treats these as a miss instead of failing the read.
    pub fn is_corrupt_entry(&self) -> bool {
        matches!(
            self,
            Error::DeserializationError(_)
                | Error::InvalidCacheEntry(_)
                | Error::VersionMismatch { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "{}", msg),
            Error::Conflict(msg) => write!(f, "{}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else if e.is_syntax() || e.is_data() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::BackendError(e.to_string())
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Error::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(db.message().to_string())
            }
            other => Error::StoreError(other.to_string()),
        }
    }
}
