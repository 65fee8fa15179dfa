//! File transfers and local staging.

use std::path::{Path, PathBuf};
use tokio::{
    fs,
    io::{AsyncReadExt, AsyncWriteExt},
};

use super::FtpStorage;
use crate::{
    error::{StorageError, StorageResult},
    events::{Notification, StorageData},
    path,
    session::{DownloadStream, RemoteSession},
};

const COPY_BUF_LEN: usize = 32 * 1024;

impl<S: RemoteSession> FtpStorage<S> {
    /// Stores a local file under the given logical folder, replacing any
    /// previous file of the same name. Missing folder segments are created
    /// on demand; `None` stores directly under the root.
    pub async fn store_file(
        &mut self,
        local_file: &Path,
        folder_path: Option<&str>,
    ) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }

        let metadata = match fs::metadata(local_file).await {
            Ok(metadata) => metadata,
            Err(err) => return self.fail(err.into()).await,
        };
        if metadata.is_dir() {
            let name = path::file_name(&local_file.to_string_lossy()).to_owned();
            let err = StorageError::InvalidOperation(format!(
                "{name} is a folder. You should call the create_folder method."
            ));
            return self.fail(err).await;
        }

        if let Some(folder) = folder_path {
            if let Err(err) = path::validate(folder) {
                return self.fail(err).await;
            }
        }

        self.notify(Notification::PreStore).await;

        match self
            .store_file_inner(local_file, folder_path.unwrap_or(""))
            .await
        {
            Ok(data) => {
                self.notify(Notification::FileStored(&data)).await;
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    /// Stores a local file named by path. Both the local path and the
    /// target folder are validated before any remote interaction.
    pub async fn store_file_from_path(
        &mut self,
        local_path: &str,
        folder_path: Option<&str>,
    ) -> StorageResult<()> {
        if let Err(err) = path::validate(local_path) {
            return self.fail(err).await;
        }
        if let Some(folder) = folder_path {
            if let Err(err) = path::validate(folder) {
                return self.fail(err).await;
            }
        }

        self.store_file(Path::new(local_path), folder_path).await
    }

    async fn store_file_inner(
        &mut self,
        local_file: &Path,
        folder_path: &str,
    ) -> StorageResult<StorageData> {
        let resolved = self.resolve(folder_path);
        self.ensure_path(&resolved).await?;

        let name = local_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StorageError::InvalidPath(format!(
                    "'{}' has no file name",
                    local_file.display()
                ))
            })?;

        // local read stream is scoped to this function, dropped on every
        // exit path
        let mut source = fs::File::open(local_file).await?;
        let mut sink = self.session.open_upload_stream(&name).await?;

        let mut buf = vec![0u8; COPY_BUF_LEN];
        loop {
            let n = source
                .read(&mut buf)
                .await
                .map_err(|e| StorageError::Local(e.to_string()))?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])
                .await
                .map_err(|e| StorageError::Remote(e.to_string()))?;
        }
        sink.shutdown()
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        debug!("stored '{name}' under '{resolved}'");

        let url = self.url_for(&resolved, &name);
        Ok(StorageData::new(
            name.clone(),
            url,
            name,
            folder_path.to_owned(),
        ))
    }

    /// Removes the file at the given logical path.
    pub async fn remove_file(&mut self, file_path: &str) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }
        if let Err(err) = path::validate(file_path) {
            return self.fail(err).await;
        }

        self.notify(Notification::PreRemove).await;

        match self.remove_file_inner(file_path).await {
            Ok(()) => {
                self.notify(Notification::FileRemoved).await;
                Ok(())
            }
            Err(err) => self.fail(err).await,
        }
    }

    async fn remove_file_inner(&mut self, file_path: &str) -> StorageResult<()> {
        self.reset_cwd().await?;

        let resolved = self.resolve(file_path);
        if !self.session.delete_file(&resolved).await? {
            return Err(StorageError::Remote(format!(
                "It couldn't remove this file '{resolved}'"
            )));
        }

        Ok(())
    }

    /// Opens the remote file at the given logical path as a stream.
    ///
    /// A blank path yields `None`; a missing remote file is an error. The
    /// caller owns the returned stream.
    pub async fn retrieve_file_as_stream(
        &mut self,
        file_path: &str,
    ) -> StorageResult<Option<DownloadStream>> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }
        if let Err(err) = path::validate(file_path) {
            return self.fail(err).await;
        }

        let trimmed = file_path.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.ends_with('/') {
            let err = StorageError::InvalidOperation(
                "Invalid path. Looks like you're trying to retrieve a folder.".to_owned(),
            );
            return self.fail(err).await;
        }

        match self.retrieve_stream_inner(trimmed).await {
            Ok(stream) => Ok(Some(stream)),
            Err(err) => self.fail(err).await,
        }
    }

    async fn retrieve_stream_inner(&mut self, file_path: &str) -> StorageResult<DownloadStream> {
        self.reset_cwd().await?;

        let resolved = self.resolve(file_path);
        Ok(self.session.open_download_stream(&resolved).await?)
    }

    /// Retrieves the remote file at the given logical path into the
    /// configured tmp directory, named by the final path segment.
    pub async fn retrieve_file(&mut self, file_path: &str) -> StorageResult<Option<PathBuf>> {
        let Some(mut stream) = self.retrieve_file_as_stream(file_path).await? else {
            return Ok(None);
        };

        let name = path::file_name(file_path.trim()).to_owned();
        let target = self.settings.tmp.join(name);

        match stage_stream(&mut stream, &target).await {
            Ok(()) => Ok(Some(target)),
            Err(err) => self.fail(err).await,
        }
    }

    /// Removes everything under the local tmp directory. The remote tree
    /// is not touched.
    pub async fn clean(&mut self) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }

        match self.clean_inner().await {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err).await,
        }
    }

    async fn clean_inner(&mut self) -> StorageResult<()> {
        let mut entries = fs::read_dir(&self.settings.tmp).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            } else {
                fs::remove_file(entry.path()).await?;
            }
        }

        Ok(())
    }
}

/// Copies a download stream into a local file. The source is drained here
/// and dropped by the caller; the local file is released on every exit
/// path.
async fn stage_stream(stream: &mut DownloadStream, target: &Path) -> StorageResult<()> {
    let mut file = fs::File::create(target)
        .await
        .map_err(|e| StorageError::Local(e.to_string()))?;

    let mut buf = vec![0u8; COPY_BUF_LEN];
    loop {
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .await
            .map_err(|e| StorageError::Local(e.to_string()))?;
    }

    file.flush()
        .await
        .map_err(|e| StorageError::Local(e.to_string()))?;
    Ok(())
}
