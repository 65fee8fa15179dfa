//! Remote session capability.
//!
//! Everything the storage needs from the wire protocol, expressed as a set
//! of directory and file primitives. The session is stateful: the working
//! directory set by [`RemoteSession::change_working_directory`] persists
//! between calls.

use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Byte sink for a single upload, wired to the session's data channel.
pub type UploadStream = Box<dyn AsyncWrite + Send + Unpin>;
/// Byte source for a single download. The caller owns and drains it.
pub type DownloadStream = Box<dyn AsyncRead + Send + Unpin>;

/// Enum for session errors
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// TCP or protocol-level connection failure
    #[error("connection: {0}")]
    Connection(String),
    /// Wrong or refused credentials
    #[error("authentication: {0}")]
    Auth(String),
    /// The server rejected a command
    #[error("{0}")]
    Rejected(String),
    /// Any errors related to I/O
    #[error("I/O: {0}")]
    IO(String),
}

impl From<io::Error> for SessionError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Kind of a remote directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Entry returned by [`RemoteSession::list_entries`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: String,
    kind: EntryKind,
}

impl DirEntry {
    pub fn new<T: Into<String>>(name: T, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Returns the entry name, without any path prefix.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Stateful connection to the remote file server. This is `async_trait`
#[async_trait]
pub trait RemoteSession: Send {
    async fn connect(&mut self, host: &str, port: u16) -> SessionResult<()>;

    async fn authenticate(&mut self, user: &str, password: &str) -> SessionResult<()>;

    async fn set_passive_mode(&mut self, passive: bool) -> SessionResult<()>;

    /// Switches transfers to binary framing.
    async fn set_binary_mode(&mut self) -> SessionResult<()>;

    /// Changes the working directory. `Ok(false)` means the target does
    /// not exist as a directory.
    async fn change_working_directory(&mut self, path: &str) -> SessionResult<bool>;

    /// Creates a single directory, relative to the working directory
    /// unless the name is absolute.
    async fn make_directory(&mut self, name: &str) -> SessionResult<()>;

    /// Removes an empty directory.
    async fn remove_directory(&mut self, path: &str) -> SessionResult<()>;

    /// Deletes a file. `Ok(false)` means the file is absent or the server
    /// refused the deletion.
    async fn delete_file(&mut self, path: &str) -> SessionResult<bool>;

    /// Lists the direct entries of a directory.
    async fn list_entries(&mut self, path: &str) -> SessionResult<Vec<DirEntry>>;

    /// Opens an upload into the working directory under `name`.
    async fn open_upload_stream(&mut self, name: &str) -> SessionResult<UploadStream>;

    /// Opens a download positioned at the start of the file at `path`.
    async fn open_download_stream(&mut self, path: &str) -> SessionResult<DownloadStream>;

    async fn disconnect(&mut self) -> SessionResult<()>;
}
