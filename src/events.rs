//! Storage lifecycle notifications.
//!
//! Listeners are registered on a storage instance and notified in
//! registration order, synchronously, around every mutating operation.

use chrono::{DateTime, Utc};

use crate::error::StorageError;

/// Immutable description of a completed mutation. Produced exactly once per
/// successful store-file or create-folder operation, never on failure.
#[derive(Debug, Clone)]
pub struct StorageData {
    name: String,
    url: String,
    raw_name: String,
    folder: String,
    created_at: DateTime<Utc>,
}

impl StorageData {
    pub(crate) fn new(name: String, url: String, raw_name: String, folder: String) -> Self {
        Self {
            name,
            url,
            raw_name,
            folder,
            created_at: Utc::now(),
        }
    }

    /// Logical name of the stored entry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved remote identifier, `<scheme>://<host>/<path>/<name>`.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Logical path of the containing folder; empty for the root.
    #[must_use]
    pub fn folder(&self) -> &str {
        &self.folder
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Storage listener. This is `async_trait`
///
/// Implement only the notifications you care about; every method defaults
/// to a no-op. A listener returning `Err` never alters the outcome of the
/// operation it observes.
#[async_trait]
pub trait StorageListener: Send + Sync {
    /// Called before a file store begins.
    async fn pre_store(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called before a file removal begins.
    async fn pre_remove(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called before a folder creation begins.
    async fn pre_create_folder(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called before a folder removal begins.
    async fn pre_remove_folder(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called after a file has been stored.
    #[allow(unused_variables)]
    async fn on_file_stored(&self, data: &StorageData) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called after a folder has been created.
    #[allow(unused_variables)]
    async fn on_folder_created(&self, data: &StorageData) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called after a file has been removed.
    async fn on_file_removed(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called after a folder has been removed.
    async fn on_folder_removed(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Called with the mapped error before it propagates to the caller.
    #[allow(unused_variables)]
    async fn on_error(&self, error: &StorageError) -> Result<(), StorageError> {
        Ok(())
    }
}

/// One notification to fan out to every registered listener.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Notification<'a> {
    PreStore,
    PreRemove,
    PreCreateFolder,
    PreRemoveFolder,
    FileStored(&'a StorageData),
    FolderCreated(&'a StorageData),
    FileRemoved,
    FolderRemoved,
    Error(&'a StorageError),
}

impl Notification<'_> {
    const fn name(self) -> &'static str {
        match self {
            Self::PreStore => "pre_store",
            Self::PreRemove => "pre_remove",
            Self::PreCreateFolder => "pre_create_folder",
            Self::PreRemoveFolder => "pre_remove_folder",
            Self::FileStored(_) => "on_file_stored",
            Self::FolderCreated(_) => "on_folder_created",
            Self::FileRemoved => "on_file_removed",
            Self::FolderRemoved => "on_folder_removed",
            Self::Error(_) => "on_error",
        }
    }
}

/// Ordered fan-out of notifications to registered listeners.
#[derive(Default)]
pub(crate) struct Dispatcher {
    listeners: Vec<Box<dyn StorageListener>>,
}

impl Dispatcher {
    pub fn register(&mut self, listener: Box<dyn StorageListener>) {
        self.listeners.push(listener);
    }

    /// Notifies every listener in registration order. A failing listener
    /// is logged and never stops the remaining listeners.
    pub async fn fire(&self, notification: Notification<'_>) {
        for listener in &self.listeners {
            let result = match notification {
                Notification::PreStore => listener.pre_store().await,
                Notification::PreRemove => listener.pre_remove().await,
                Notification::PreCreateFolder => listener.pre_create_folder().await,
                Notification::PreRemoveFolder => listener.pre_remove_folder().await,
                Notification::FileStored(data) => listener.on_file_stored(data).await,
                Notification::FolderCreated(data) => listener.on_folder_created(data).await,
                Notification::FileRemoved => listener.on_file_removed().await,
                Notification::FolderRemoved => listener.on_folder_removed().await,
                Notification::Error(error) => listener.on_error(error).await,
            };

            if let Err(err) = result {
                warn!("listener failed on {}: {}", notification.name(), err);
            }
        }
    }
}
