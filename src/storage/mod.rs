//! Storage facade.
//!
//! [`FtpStorage`] composes path resolution, directory-tree manipulation and
//! streaming transfers over one remote session, and fans lifecycle
//! notifications out to registered listeners around every operation.

mod tree;
mod transfer;

use crate::{
    error::{StorageError, StorageResult},
    events::{Dispatcher, Notification, StorageListener},
    path,
    session::RemoteSession,
    settings::StorageSettings,
};

/// Scheme used when composing event identifiers.
const URL_SCHEME: &str = "ftp";

/// File storage over one stateful remote session.
///
/// Every operation takes `&mut self`: the session's working directory is
/// shared protocol state, so calls on one instance are inherently
/// sequential. Give each concurrent caller its own instance (and with it,
/// its own connection).
pub struct FtpStorage<S: RemoteSession> {
    session: S,
    settings: StorageSettings,
    dispatcher: Dispatcher,
    closed: bool,
}

impl<S: RemoteSession> FtpStorage<S> {
    /// Connects and authenticates the session according to the settings,
    /// then switches it to binary transfers.
    pub async fn open(settings: StorageSettings, mut session: S) -> StorageResult<Self> {
        session.connect(&settings.host, settings.port).await?;
        session
            .authenticate(&settings.user, &settings.password)
            .await?;

        if settings.passive {
            session.set_passive_mode(true).await?;
        }

        session.set_binary_mode().await?;
        debug!("session established to {}:{}", settings.host, settings.port);

        Ok(Self {
            session,
            settings,
            dispatcher: Dispatcher::default(),
            closed: false,
        })
    }

    /// Registers a lifecycle listener. Registration order is notification
    /// order; listeners live as long as this instance.
    pub fn register_listener(&mut self, listener: Box<dyn StorageListener>) {
        self.dispatcher.register(listener);
    }

    #[must_use]
    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    /// Disconnects the session. The instance is unusable afterwards: any
    /// further operation fails instead of silently reconnecting.
    pub async fn close(&mut self) -> StorageResult<()> {
        if let Err(err) = self.ensure_open() {
            return self.fail(err).await;
        }

        self.closed = true;
        match self.session.disconnect().await {
            Ok(()) => Ok(()),
            Err(err) => self.fail(err.into()).await,
        }
    }

    pub(crate) fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::InvalidOperation(
                "storage is closed".to_owned(),
            ));
        }

        Ok(())
    }

    /// Notifies error listeners, then surfaces the error.
    pub(crate) async fn fail<T>(&self, err: StorageError) -> StorageResult<T> {
        self.dispatcher.fire(Notification::Error(&err)).await;
        Err(err)
    }

    pub(crate) async fn notify(&self, notification: Notification<'_>) {
        self.dispatcher.fire(notification).await;
    }

    /// Puts the session back at the filesystem root. Working-directory
    /// state left by a previous operation must never leak into the path
    /// resolution of the next one.
    pub(crate) async fn reset_cwd(&mut self) -> StorageResult<()> {
        if !self.session.change_working_directory("/").await? {
            return Err(StorageError::Remote(
                "cannot enter the filesystem root".to_owned(),
            ));
        }

        Ok(())
    }

    pub(crate) fn resolve(&self, logical: &str) -> String {
        path::resolve(&self.settings.root, logical)
    }

    pub(crate) fn url_for(&self, resolved: &str, name: &str) -> String {
        let full = path::collapse(&format!("/{resolved}/{name}"));
        format!(
            "{URL_SCHEME}://{}{}",
            self.settings.host,
            full.trim_end_matches('/')
        )
    }
}
