//! Defines the error type shared by documents and query results.

use jsonxp_path::PathError;
use thiserror::Error;

/// The main error enum for all document and result operations.
///
/// Errors are `Clone` so a [`QueryResult`](crate::QueryResult) can hand out
/// its sticky error without giving it up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid JSON input: {0}")]
    InvalidInput(String),
    #[error("Invalid query syntax in '{path}' at offset {position}: {message}")]
    InvalidQuerySyntax {
        path: String,
        position: usize,
        message: String,
    },
    #[error("No match for '{0}'")]
    NotFound(String),
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Document is a read-only view")]
    ReadOnly,
    #[error("Recursion depth limit of {0} exceeded")]
    RecursionLimit(usize),
}

/// The class of an [`Error`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    InvalidQuerySyntax,
    NotFound,
    TypeMismatch,
    ReadOnly,
    RecursionLimit,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::InvalidQuerySyntax { .. } => ErrorKind::InvalidQuerySyntax,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::ReadOnly => ErrorKind::ReadOnly,
            Error::RecursionLimit(_) => ErrorKind::RecursionLimit,
        }
    }

    pub(crate) fn syntax(path: &str, message: impl Into<String>) -> Self {
        Error::InvalidQuerySyntax {
            path: path.to_string(),
            position: 0,
            message: message.into(),
        }
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        match e {
            PathError::Syntax {
                path,
                position,
                message,
            } => Error::InvalidQuerySyntax {
                path,
                position,
                message,
            },
            PathError::DepthLimitExceeded(depth) => Error::RecursionLimit(depth),
            PathError::Decode(message) => Error::InvalidInput(message),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput(e.to_string())
    }
}
