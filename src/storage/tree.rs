//! Directory-tree manipulation.
//!
//! The remote protocol has no recursive primitives, so nested creation and
//! subtree removal are decomposed into sequences of single directory
//! operations. Partial progress is never rolled back.

use super::FtpStorage;
use crate::{
    error::{StorageError, StorageResult},
    events::{Notification, StorageData},
    path,
    session::RemoteSession,
};

impl<S: RemoteSession> FtpStorage<S> {
    /// Guarantees that every segment of `remote_path` exists as a
    /// directory, creating missing segments in order.
    ///
    /// Strictly left-to-right: a segment is only created after all its
    /// ancestors have been entered, so no orphaned partial path can appear
    /// within this session's view of the tree.
    pub(crate) async fn ensure_path(&mut self, remote_path: &str) -> StorageResult<()> {
        self.reset_cwd().await?;

        for segment in path::segments(remote_path) {
            if !self.session.change_working_directory(segment).await? {
                self.session.make_directory(segment).await?;
                if !self.session.change_working_directory(segment).await? {
                    return Err(StorageError::Remote(format!(
                        "cannot enter directory '{segment}' right after creating it"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Deletes a directory and everything beneath it, children before
    /// parent. A directory is never removed while it still has entries;
    /// entries deleted before a failure stay deleted.
    pub(crate) async fn remove_subtree(&mut self, remote_path: &str) -> StorageResult<()> {
        let entries = self.session.list_entries(remote_path).await?;

        for entry in &entries {
            let full_path = path::join(remote_path, entry.name());

            if entry.is_directory() {
                Box::pin(self.remove_subtree(&full_path)).await?;
            } else if !self.session.delete_file(&full_path).await? {
                return Err(StorageError::Remote(format!(
                    "It couldn't remove this file '{full_path}'"
                )));
            }
        }

        self.session.remove_directory(remote_path).await?;
        Ok(())
    }

    /// Creates a new folder under the root.
    ///
    /// One make-directory call at the resolved path: parent segments are
    /// assumed to exist already, unlike [`store_file`](Self::store_file)
    /// which creates them on demand.
    pub async fn create_folder(&mut self, folder_path: &str) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }
        if let Err(err) = path::validate(folder_path) {
            return self.fail(err).await;
        }
        if folder_path.trim().is_empty() {
            let err =
                StorageError::InvalidPath("the path shouldn't be empty".to_owned());
            return self.fail(err).await;
        }

        self.notify(Notification::PreCreateFolder).await;

        match self.create_folder_inner(folder_path).await {
            Ok(data) => {
                self.notify(Notification::FolderCreated(&data)).await;
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    async fn create_folder_inner(&mut self, folder_path: &str) -> StorageResult<StorageData> {
        self.reset_cwd().await?;

        let resolved = self.resolve(folder_path);
        self.session.make_directory(&resolved).await?;
        debug!("created folder '{resolved}'");

        let logical = path::collapse(folder_path.trim());
        let logical = logical.trim_matches('/');
        let name = path::file_name(logical).to_owned();
        let parent = logical
            .strip_suffix(&name)
            .unwrap_or("")
            .trim_end_matches('/')
            .to_owned();
        let url = self.url_for(&resolved, "");

        Ok(StorageData::new(name.clone(), url, name, parent))
    }

    /// Removes the folder at `folder_path` together with its whole
    /// subtree. A blank path is a silent no-op.
    pub async fn remove_folder(&mut self, folder_path: &str) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }
        if let Err(err) = path::validate(folder_path) {
            return self.fail(err).await;
        }
        if folder_path.trim().is_empty() {
            return Ok(());
        }

        self.notify(Notification::PreRemoveFolder).await;

        match self.remove_folder_inner(folder_path).await {
            Ok(()) => {
                self.notify(Notification::FolderRemoved).await;
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    async fn remove_folder_inner(&mut self, folder_path: &str) -> StorageResult<()> {
        self.reset_cwd().await?;

        let resolved = self.resolve(folder_path);
        self.remove_subtree(&resolved).await
    }

    /// Removes every entry under the root, leaving the root itself in
    /// place but empty.
    pub async fn wipe(&mut self) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }

        match self.wipe_inner().await {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err).await,
        }
    }

    async fn wipe_inner(&mut self) -> StorageResult<()> {
        self.reset_cwd().await?;

        let root = self.resolve("");
        let entries = self.session.list_entries(&root).await?;

        for entry in &entries {
            let full_path = path::join(&root, entry.name());

            if entry.is_directory() {
                self.remove_subtree(&full_path).await?;
            } else if !self.session.delete_file(&full_path).await? {
                return Err(StorageError::Remote(format!(
                    "It couldn't remove this file '{full_path}'"
                )));
            }
        }

        Ok(())
    }
}
