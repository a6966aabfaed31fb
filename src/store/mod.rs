//! Storage gateway: where recordings are saved and loaded from.
//!
//! Two interchangeable strategies sit behind [`RecordStore`]:
//!
//! - [`local::LocalRecordStore`] keeps one JSON file per test and only
//!   ever persists passing tests.
//! - [`remote::RemoteRecordStore`] posts every attempt, with its outcome,
//!   to a recording service that keeps history.

pub mod local;
pub mod remote;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::warn;

use crate::cassette::format::{LoadedRecord, TestApiRecordData, TestIdentity};
use crate::config::{MagicBackendConfig, API_KEY_ENV};
use crate::error::{Error, Result};
use crate::mode::StorageMode;
use crate::ports::{Clock, FileSystem};

/// Boxed future type alias used by [`RecordStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What a save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The recording was persisted.
    Saved,
    /// The strategy declined to persist it (for example a failed test).
    Skipped,
}

/// Saves and loads recordings.
pub trait RecordStore: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StorageMode;

    /// Whether every attempt is kept, so that failed attempts are worth saving.
    fn retains_history(&self) -> bool;

    /// Loads the recording(s) for a test; `Ok(None)` when there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached or its data is invalid.
    fn load<'a>(&'a self, test: &'a TestIdentity) -> StoreFuture<'a, Option<LoadedRecord>>;

    /// Persists a recording for a test.
    ///
    /// # Errors
    ///
    /// Returns an error if the recording cannot be written.
    fn save<'a>(
        &'a self,
        test: &'a TestIdentity,
        record: &'a TestApiRecordData,
    ) -> StoreFuture<'a, SaveOutcome>;
}

/// Build the strategy selected by `kind`, reading the remote credential
/// from `MAGIC_BACKEND_API_KEY`.
///
/// # Errors
///
/// Returns [`Error::MissingApiKey`] or [`Error::MissingRemoteUrl`] when the
/// remote strategy is selected without its credential or endpoint.
pub fn open_store(
    kind: StorageMode,
    config: &MagicBackendConfig,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn RecordStore>> {
    let api_key = std::env::var(API_KEY_ENV).ok();
    open_store_with_key(kind, config, api_key, fs, clock)
}

/// Like [`open_store`] with the remote credential given explicitly. An
/// empty key counts as missing.
///
/// # Errors
///
/// Same as [`open_store`].
pub fn open_store_with_key(
    kind: StorageMode,
    config: &MagicBackendConfig,
    api_key: Option<String>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn RecordStore>> {
    match kind {
        StorageMode::Local => {
            Ok(Box::new(local::LocalRecordStore::new(config.recordings_dir(), fs)))
        }
        StorageMode::Remote => {
            let api_key = api_key
                .filter(|key| !key.is_empty())
                .ok_or(Error::MissingApiKey(API_KEY_ENV))?;
            let url = config.remote_url.clone().ok_or(Error::MissingRemoteUrl)?;
            Ok(Box::new(remote::RemoteRecordStore::new(url, api_key, clock)))
        }
    }
}

/// Load the recording to replay against, or `None`.
///
/// Load failures never abort a test: they are logged and treated as "no
/// recording found".
pub async fn load_baseline(
    store: &dyn RecordStore,
    test: &TestIdentity,
) -> Option<TestApiRecordData> {
    load_soft(store, test).await.and_then(LoadedRecord::into_baseline)
}

/// Load every retained attempt for a test, oldest first.
pub async fn load_history(store: &dyn RecordStore, test: &TestIdentity) -> Vec<TestApiRecordData> {
    load_soft(store, test).await.map(LoadedRecord::into_history).unwrap_or_default()
}

/// Load once and split into the baseline and the full history, for
/// INSPECT runs that need both.
pub async fn load_with_history(
    store: &dyn RecordStore,
    test: &TestIdentity,
) -> (Option<TestApiRecordData>, Vec<TestApiRecordData>) {
    match load_soft(store, test).await {
        Some(loaded) => (loaded.clone().into_baseline(), loaded.into_history()),
        None => (None, Vec::new()),
    }
}

async fn load_soft(store: &dyn RecordStore, test: &TestIdentity) -> Option<LoadedRecord> {
    match store.load(test).await {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(
                store = %store.kind(),
                spec = %test.spec_name,
                test = %test.test_name(),
                error = %e,
                "could not load recorded API calls"
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory doubles shared by store and session tests.

    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::{LoadedRecord, RecordStore, SaveOutcome, StoreFuture};
    use crate::cassette::format::{TestApiRecordData, TestIdentity};
    use crate::error::Error;
    use crate::mode::StorageMode;
    use crate::ports::FileSystem;

    /// In-memory filesystem for testing stores without touching disk.
    #[derive(Default)]
    pub struct MemFs {
        pub files: Mutex<HashMap<PathBuf, String>>,
    }

    impl FileSystem for MemFs {
        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            let files = self.files.lock().unwrap();
            files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
            })
        }

        fn write(&self, path: &Path, contents: &str) -> std::io::Result<()> {
            self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }
    }

    /// History-keeping store that remembers every save, optionally failing loads.
    #[derive(Default)]
    pub struct MemStore {
        pub saved: Mutex<Vec<TestApiRecordData>>,
        pub fail_loads: bool,
    }

    impl RecordStore for MemStore {
        fn kind(&self) -> StorageMode {
            StorageMode::Remote
        }

        fn retains_history(&self) -> bool {
            true
        }

        fn load<'a>(&'a self, test: &'a TestIdentity) -> StoreFuture<'a, Option<LoadedRecord>> {
            Box::pin(async move {
                if self.fail_loads {
                    return Err(Error::RemoteStatus {
                        status: 500,
                        expected: 200,
                        body: String::new(),
                    });
                }
                let saved = self.saved.lock().unwrap();
                let matching: Vec<_> = saved
                    .iter()
                    .filter(|r| r.spec_name == test.spec_name && r.test_name == test.test_name())
                    .cloned()
                    .collect();
                Ok((!matching.is_empty()).then_some(LoadedRecord::History(matching)))
            })
        }

        fn save<'a>(
            &'a self,
            _test: &'a TestIdentity,
            record: &'a TestApiRecordData,
        ) -> StoreFuture<'a, SaveOutcome> {
            Box::pin(async move {
                self.saved.lock().unwrap().push(record.clone());
                Ok(SaveOutcome::Saved)
            })
        }
    }
}
