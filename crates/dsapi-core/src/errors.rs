use std::fmt;
use thiserror::Error;

/// A criteria string that could not be parsed. `position` is a byte offset
/// into the submitted criteria.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at {position}: {reason}")]
pub struct ParseError {
    pub position: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Unavailable,
    Timeout,
    /// The backend rejected the rendered query.
    Malformed,
}

impl BackendErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, BackendErrorKind::Unavailable | BackendErrorKind::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendErrorKind::Unavailable => "unavailable",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("backend {kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Malformed, message)
    }
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("dataset not found: {key}/{version}")]
    DatasetNotFound { key: String, version: String },
    #[error("no records matched the criteria")]
    NoRecords,
    #[error("unknown field `{0}`")]
    InvalidField(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParam { name: String, reason: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("search cancelled")]
    Cancelled,
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl DataError {
    pub fn not_found(key: &str, version: &str) -> Self {
        DataError::DatasetNotFound {
            key: key.to_string(),
            version: version.to_string(),
        }
    }

    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        DataError::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
