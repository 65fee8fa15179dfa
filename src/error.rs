use std::io;
use thiserror::Error;

use crate::session::SessionError;

/// Uniform error for every failure surfaced at the storage boundary.
///
/// Carries a kind tag and the original message. Mapping happens once, at
/// the failing primitive, so nested operations never double-wrap.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Missing or illegal path input
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Semantically wrong call for the target entry
    #[error("{0}")]
    InvalidOperation(String),
    /// Any failure reported by the remote session
    #[error("remote I/O: {0}")]
    Remote(String),
    /// Failure reading or writing the local filesystem
    #[error("local I/O: {0}")]
    Local(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        Self::Local(err.to_string())
    }
}

impl From<SessionError> for StorageError {
    fn from(err: SessionError) -> Self {
        Self::Remote(err.to_string())
    }
}
