//! In-memory remote session and listener doubles used by the unit tests.

use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::Path,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};
use tokio::io::AsyncWrite;

use crate::{
    error::StorageError,
    events::{StorageData, StorageListener},
    path,
    session::{
        DirEntry, DownloadStream, EntryKind, RemoteSession, SessionError, SessionResult,
        UploadStream,
    },
    settings::StorageSettings,
    storage::FtpStorage,
};

/// Remote tree shared between a [`MemorySession`] and the test body.
/// Paths are absolute, collapsed, without trailing separator.
#[derive(Default)]
pub struct RemoteTree {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
}

impl RemoteTree {
    pub fn mkdirs(&mut self, dir_path: &str) {
        let mut acc = String::new();
        for segment in path::segments(dir_path) {
            acc.push('/');
            acc.push_str(segment);
            let _ = self.dirs.insert(acc.clone());
        }
    }

    pub fn put_file(&mut self, file_path: &str, contents: &[u8]) {
        self.mkdirs(parent_of(file_path));
        let _ = self.files.insert(file_path.to_owned(), contents.to_vec());
    }

    fn is_dir(&self, dir_path: &str) -> bool {
        dir_path == "/" || self.dirs.contains(dir_path)
    }

    fn has_children(&self, dir_path: &str) -> bool {
        let prefix = format!("{dir_path}/");
        self.dirs.iter().any(|d| d.starts_with(&prefix))
            || self.files.keys().any(|f| f.starts_with(&prefix))
    }
}

/// Observable side effects of a [`MemorySession`].
#[derive(Default)]
pub struct Stats {
    pub connected: bool,
    pub authenticated: bool,
    pub passive: Option<bool>,
    pub binary: bool,
    pub cwd_calls: usize,
    pub mkdir_calls: usize,
}

/// [`RemoteSession`] over an in-memory tree, with a stateful working
/// directory like the real protocol.
pub struct MemorySession {
    tree: Arc<Mutex<RemoteTree>>,
    stats: Arc<Mutex<Stats>>,
    cwd: String,
}

impl MemorySession {
    pub fn new(tree: Arc<Mutex<RemoteTree>>, stats: Arc<Mutex<Stats>>) -> Self {
        Self {
            tree,
            stats,
            cwd: "/".to_owned(),
        }
    }

    fn normalize(&self, raw: &str) -> String {
        let joined = if raw.starts_with('/') {
            path::collapse(raw)
        } else {
            path::collapse(&format!("{}/{raw}", self.cwd))
        };

        if joined.len() > 1 {
            joined.trim_end_matches('/').to_owned()
        } else {
            joined
        }
    }
}

fn parent_of(p: &str) -> &str {
    match p.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn rejected(message: String) -> SessionError {
    SessionError::Rejected(message)
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn connect(&mut self, _host: &str, _port: u16) -> SessionResult<()> {
        self.stats.lock().unwrap().connected = true;
        Ok(())
    }

    async fn authenticate(&mut self, _user: &str, _password: &str) -> SessionResult<()> {
        self.stats.lock().unwrap().authenticated = true;
        Ok(())
    }

    async fn set_passive_mode(&mut self, passive: bool) -> SessionResult<()> {
        self.stats.lock().unwrap().passive = Some(passive);
        Ok(())
    }

    async fn set_binary_mode(&mut self) -> SessionResult<()> {
        self.stats.lock().unwrap().binary = true;
        Ok(())
    }

    async fn change_working_directory(&mut self, dir_path: &str) -> SessionResult<bool> {
        self.stats.lock().unwrap().cwd_calls += 1;

        let target = self.normalize(dir_path);
        if self.tree.lock().unwrap().is_dir(&target) {
            self.cwd = target;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn make_directory(&mut self, name: &str) -> SessionResult<()> {
        self.stats.lock().unwrap().mkdir_calls += 1;

        let target = self.normalize(name);
        let mut tree = self.tree.lock().unwrap();

        if !tree.is_dir(parent_of(&target)) {
            return Err(rejected(format!("550 '{name}': no such parent directory")));
        }
        if tree.dirs.contains(&target) || tree.files.contains_key(&target) {
            return Err(rejected(format!("550 '{name}': already exists")));
        }

        let _ = tree.dirs.insert(target);
        Ok(())
    }

    async fn remove_directory(&mut self, dir_path: &str) -> SessionResult<()> {
        let target = self.normalize(dir_path);
        let mut tree = self.tree.lock().unwrap();

        if target == "/" {
            return Err(rejected("550 refusing to remove the root".to_owned()));
        }
        if !tree.dirs.contains(&target) {
            return Err(rejected(format!("550 '{dir_path}': no such directory")));
        }
        if tree.has_children(&target) {
            return Err(rejected(format!("550 '{dir_path}': directory not empty")));
        }

        let _ = tree.dirs.remove(&target);
        Ok(())
    }

    async fn delete_file(&mut self, file_path: &str) -> SessionResult<bool> {
        let target = self.normalize(file_path);
        Ok(self.tree.lock().unwrap().files.remove(&target).is_some())
    }

    async fn list_entries(&mut self, dir_path: &str) -> SessionResult<Vec<DirEntry>> {
        let target = self.normalize(dir_path);
        let tree = self.tree.lock().unwrap();

        if !tree.is_dir(&target) {
            return Err(rejected(format!("550 '{dir_path}': no such directory")));
        }

        let mut entries: Vec<DirEntry> = tree
            .dirs
            .iter()
            .filter(|d| parent_of(d) == target)
            .map(|d| DirEntry::new(path::file_name(d), EntryKind::Directory))
            .collect();
        entries.extend(
            tree.files
                .keys()
                .filter(|f| parent_of(f) == target)
                .map(|f| DirEntry::new(path::file_name(f), EntryKind::File)),
        );

        Ok(entries)
    }

    async fn open_upload_stream(&mut self, name: &str) -> SessionResult<UploadStream> {
        let target = self.normalize(name);

        if !self.tree.lock().unwrap().is_dir(parent_of(&target)) {
            return Err(rejected(format!("553 '{name}': no such directory")));
        }

        Ok(Box::new(MemoryUpload {
            tree: self.tree.clone(),
            target,
            buf: Vec::new(),
        }))
    }

    async fn open_download_stream(&mut self, file_path: &str) -> SessionResult<DownloadStream> {
        let target = self.normalize(file_path);

        match self.tree.lock().unwrap().files.get(&target) {
            Some(contents) => Ok(Box::new(io::Cursor::new(contents.clone()))),
            None => Err(rejected(format!("550 '{file_path}': no such file"))),
        }
    }

    async fn disconnect(&mut self) -> SessionResult<()> {
        self.stats.lock().unwrap().connected = false;
        Ok(())
    }
}

/// Upload sink that commits the collected bytes on shutdown.
struct MemoryUpload {
    tree: Arc<Mutex<RemoteTree>>,
    target: String,
    buf: Vec<u8>,
}

impl AsyncWrite for MemoryUpload {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        self.get_mut().buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.get_mut();
        let contents = std::mem::take(&mut this.buf);
        let _ = this
            .tree
            .lock()
            .unwrap()
            .files
            .insert(this.target.clone(), contents);
        Poll::Ready(Ok(()))
    }
}

/// Listener that records every notification it receives, in order, as
/// `<label>:<event>` strings. A failing listener errors on every call.
pub struct RecordingListener {
    label: &'static str,
    fail: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingListener {
    pub fn labelled(label: &'static str) -> Self {
        Self {
            label,
            fail: false,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(label: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::labelled(label)
        }
    }

    /// Listener sharing a log with others, for cross-listener ordering.
    pub fn sharing(label: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label,
            fail: false,
            log,
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        self.log.clone()
    }

    fn record(&self, event: &str) -> Result<(), StorageError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{event}", self.label));

        if self.fail {
            Err(StorageError::InvalidOperation(
                "listener failure".to_owned(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageListener for RecordingListener {
    async fn pre_store(&self) -> Result<(), StorageError> {
        self.record("pre_store")
    }

    async fn pre_remove(&self) -> Result<(), StorageError> {
        self.record("pre_remove")
    }

    async fn pre_create_folder(&self) -> Result<(), StorageError> {
        self.record("pre_create_folder")
    }

    async fn pre_remove_folder(&self) -> Result<(), StorageError> {
        self.record("pre_remove_folder")
    }

    async fn on_file_stored(&self, data: &StorageData) -> Result<(), StorageError> {
        self.record(&format!("on_file_stored {}", data.url()))
    }

    async fn on_folder_created(&self, _data: &StorageData) -> Result<(), StorageError> {
        self.record("on_folder_created")
    }

    async fn on_file_removed(&self) -> Result<(), StorageError> {
        self.record("on_file_removed")
    }

    async fn on_folder_removed(&self) -> Result<(), StorageError> {
        self.record("on_folder_removed")
    }

    async fn on_error(&self, _error: &StorageError) -> Result<(), StorageError> {
        self.record("on_error")
    }
}

/// Opens a storage over a fresh in-memory session with `root` already
/// present on the remote side.
pub async fn open_storage(
    root: &str,
) -> (
    FtpStorage<MemorySession>,
    Arc<Mutex<RemoteTree>>,
    Arc<Mutex<Stats>>,
) {
    open_storage_with_tmp(root, &std::env::temp_dir()).await
}

pub async fn open_storage_with_tmp(
    root: &str,
    tmp: &Path,
) -> (
    FtpStorage<MemorySession>,
    Arc<Mutex<RemoteTree>>,
    Arc<Mutex<Stats>>,
) {
    let tree = Arc::new(Mutex::new(RemoteTree::default()));
    tree.lock().unwrap().mkdirs(&format!("/{root}"));

    let stats = Arc::new(Mutex::new(Stats::default()));
    let session = MemorySession::new(tree.clone(), stats.clone());

    let settings = StorageSettings {
        host: "localhost".to_owned(),
        port: 21,
        user: "tester".to_owned(),
        password: "secret".to_owned(),
        passive: true,
        root: root.to_owned(),
        tmp: tmp.to_path_buf(),
    };

    let storage = FtpStorage::open(settings, session).await.unwrap();
    (storage, tree, stats)
}
