//! Service context bundling the ports and storage strategies.

use std::sync::Arc;

use tracing::debug;

use crate::adapters::live::{LiveClock, LiveFileSystem};
use crate::config::MagicBackendConfig;
use crate::error::{Error, Result};
use crate::mode::{ModeController, StorageMode};
use crate::ports::{Clock, FileSystem};
use crate::store::{open_store, RecordStore};

/// Everything a recording session needs from the outside world.
///
/// The local store is always available. The remote store is opened only
/// when the configuration selects it, so a missing credential fails at
/// setup instead of in the middle of a test.
pub struct ServiceContext {
    /// Clock used to time calls.
    pub clock: Arc<dyn Clock>,
    /// Filesystem behind the local store.
    pub fs: Arc<dyn FileSystem>,
    local: Box<dyn RecordStore>,
    remote: Option<Box<dyn RecordStore>>,
}

impl ServiceContext {
    /// Creates a context with real adapters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the configured store is invalid,
    /// or is `remote` without its credential or endpoint.
    pub fn live(config: &MagicBackendConfig) -> Result<Self> {
        Self::new(config, Arc::new(LiveClock), Arc::new(LiveFileSystem))
    }

    /// Creates a context from the given adapters.
    ///
    /// # Errors
    ///
    /// Same as [`ServiceContext::live`].
    pub fn new(
        config: &MagicBackendConfig,
        clock: Arc<dyn Clock>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let local = open_store(StorageMode::Local, config, fs.clone(), clock.clone())?;
        let remote = match ModeController::resolve_storage(config.store.as_deref())? {
            StorageMode::Remote => {
                Some(open_store(StorageMode::Remote, config, fs.clone(), clock.clone())?)
            }
            StorageMode::Local => None,
        };
        Ok(Self { clock, fs, local, remote })
    }

    /// Replace the strategy of the store's kind.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn RecordStore>) -> Self {
        debug!(store = %store.kind(), "using custom record store");
        match store.kind() {
            StorageMode::Local => self.local = store,
            StorageMode::Remote => self.remote = Some(store),
        }
        self
    }

    /// The strategy for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `kind` is remote but no remote store
    /// was opened.
    pub fn store(&self, kind: StorageMode) -> Result<&dyn RecordStore> {
        match kind {
            StorageMode::Local => Ok(self.local.as_ref()),
            StorageMode::Remote => self
                .remote
                .as_deref()
                .ok_or_else(|| Error::Config("the remote store is not configured".to_string())),
        }
    }
}
