use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("dangling reference: no {entity} with uid {uid}")]
    DanglingReference { entity: &'static str, uid: i64 },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("storage unavailable: {0}")]
    Storage(rusqlite::Error),

    #[error("storage unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking store call did not run to completion.
    #[error("storage worker failed: {0}")]
    Worker(String),
}

/// Coarse classification of [`Error`], for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied value violates a field constraint.
    InvalidArgument,
    /// An operation referenced a row that does not exist.
    DanglingReference,
    /// A direct insert collided with a uniqueness constraint.
    ConstraintViolation,
    /// The persistence medium failed. Not retried by the store.
    StorageUnavailable,
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) const fn dangling(entity: &'static str, uid: i64) -> Self {
        Self::DanglingReference { entity, uid }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::DanglingReference { .. } => ErrorKind::DanglingReference,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::Storage(_) | Self::Io(_) | Self::Worker(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Returns `true` when the caller referenced a row that is gone, which
    /// usually means it raced a deletion.
    pub const fn is_dangling(&self) -> bool {
        matches!(self, Self::DanglingReference { .. })
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(err.to_string()),
            _ => Self::Storage(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
