use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

/// Error kinds for shelfdb operations.
///
/// Each kind describes one category of failure, so callers can match on the
/// category without parsing error messages.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Contract errors - surfaced through the repository trait
    /// The referenced record id does not exist
    NotFound,
    /// A caller supplied an id for a record the backend must assign
    InvalidId,

    // Filter errors
    /// A filter specification names an operator token no evaluator or
    /// compiler implements
    UnsupportedOperator,
    /// A predicate carries a malformed comparison value (e.g. `in` without
    /// a list)
    FilterError,

    // Codec and schema errors
    /// A stored value cannot be round-tripped through the value codec
    SerializationError,
    /// A table descriptor is missing its table name or declares no fields
    SchemaError,
    /// Error encoding or decoding data
    EncodingError,

    // IO and storage errors
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for a file operation
    PermissionDenied,
    /// Error from a storage engine
    BackendError,

    // Operation errors
    /// The operation is not valid in the current context
    InvalidOperation,

    // Generic/internal errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidId => write!(f, "Invalid id"),
            ErrorKind::UnsupportedOperator => write!(f, "Unsupported operator"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::SerializationError => write!(f, "Serialization error"),
            ErrorKind::SchemaError => write!(f, "Schema error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom shelfdb error type.
///
/// `ShelfError` encapsulates the error message, kind, and an optional cause.
/// It supports error chaining and backtraces for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use shelfdb::errors::{ErrorKind, ShelfError, ShelfResult};
///
/// fn example() -> ShelfResult<()> {
///     Err(ShelfError::new("record 42 not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Clone)]
pub struct ShelfError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<ShelfError>>,
    backtrace: Backtrace,
}

impl ShelfError {
    /// Creates a new `ShelfError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        ShelfError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Backtrace::new(),
        }
    }

    /// Creates a new `ShelfError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: ShelfError) -> Self {
        ShelfError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Backtrace::new(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&ShelfError> {
        self.cause.as_deref()
    }
}

impl Display for ShelfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for ShelfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace),
        }
    }
}

impl Error for ShelfError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for shelfdb operations.
///
/// `ShelfResult<T>` is shorthand for `Result<T, ShelfError>`. All fallible
/// shelfdb operations return this type.
pub type ShelfResult<T> = Result<T, ShelfError>;

// From trait implementations for automatic error conversion
impl From<std::io::Error> for ShelfError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        ShelfError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for ShelfError {
    fn from(err: serde_json::Error) -> Self {
        ShelfError::new(
            &format!("JSON error: {}", err),
            ErrorKind::SerializationError,
        )
    }
}

impl From<rusqlite::Error> for ShelfError {
    fn from(err: rusqlite::Error) -> Self {
        ShelfError::new(&format!("SQLite error: {}", err), ErrorKind::BackendError)
    }
}

impl From<chrono::ParseError> for ShelfError {
    fn from(err: chrono::ParseError) -> Self {
        ShelfError::new(
            &format!("Timestamp parsing error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<String> for ShelfError {
    fn from(msg: String) -> Self {
        ShelfError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for ShelfError {
    fn from(msg: &str) -> Self {
        ShelfError::new(msg, ErrorKind::InternalError)
    }
}
