use std::fmt;
use thiserror::Error;

/// The error type for signing and stream operations.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input to the signer is missing or malformed: empty region or
    /// service, empty credentials, an unparseable timestamp, or a
    /// pre-supplied payload hash that is not a lowercase hex digest.
    InvalidArgument,

    /// A read from the body stream or one of its tee branches failed.
    BodyReadFailure,

    /// A stream operation required seeking a source that refuses to seek.
    StreamNotSeekable,

    /// A seek resolved to a negative absolute position.
    InvalidSeek,

    /// A header value contains bytes outside the range SigV4 is defined
    /// for (`0x09`, `0x20`-`0x7E`).
    EncodingError,

    /// The HMAC primitive reported failure. Should be infallible;
    /// surfaced defensively instead of panicking.
    InternalHashFailure,

    /// An internal invariant was broken (e.g. a stream that claims to be
    /// a tee but refuses to open a branch).
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

// Convenience constructors
impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a body read failure error.
    pub fn body_read_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BodyReadFailure, message)
    }

    /// Create a stream not seekable error.
    pub fn stream_not_seekable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StreamNotSeekable, message)
    }

    /// Create an invalid seek error.
    pub fn invalid_seek(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSeek, message)
    }

    /// Create an encoding error.
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EncodingError, message)
    }

    /// Create an internal hash failure error.
    pub fn internal_hash_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalHashFailure, message)
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid argument"),
            ErrorKind::BodyReadFailure => write!(f, "body read failure"),
            ErrorKind::StreamNotSeekable => write!(f, "stream not seekable"),
            ErrorKind::InvalidSeek => write!(f, "invalid seek"),
            ErrorKind::EncodingError => write!(f, "encoding error"),
            ErrorKind::InternalHashFailure => write!(f, "internal hash failure"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::body_read_failure(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::invalid_argument(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::encoding_error(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
