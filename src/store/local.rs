//! Local file strategy: one pretty-printed JSON recording per test.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::{RecordStore, SaveOutcome, StoreFuture};
use crate::cassette::format::{LoadedRecord, TestApiRecordData, TestIdentity, TestState};
use crate::mode::StorageMode;
use crate::ports::FileSystem;

/// Keeps the latest passing recording of each test under a directory.
pub struct LocalRecordStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LocalRecordStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { root, fs }
    }

    /// Recording file for a test:
    /// `<root>/<spec>_<title parts joined by _>_api_calls.json`.
    #[must_use]
    pub fn path_for(&self, test: &TestIdentity) -> PathBuf {
        self.root.join(format!("{}_{}_api_calls.json", test.spec_name, test.file_title()))
    }
}

impl RecordStore for LocalRecordStore {
    fn kind(&self) -> StorageMode {
        StorageMode::Local
    }

    fn retains_history(&self) -> bool {
        false
    }

    fn load<'a>(&'a self, test: &'a TestIdentity) -> StoreFuture<'a, Option<LoadedRecord>> {
        Box::pin(async move {
            let path = self.path_for(test);
            if !self.fs.exists(&path) {
                debug!(path = %path.display(), "no local recording");
                return Ok(None);
            }
            let content = self.fs.read_to_string(&path)?;
            let record: TestApiRecordData = serde_json::from_str(&content)?;
            Ok(Some(LoadedRecord::Single(record)))
        })
    }

    fn save<'a>(
        &'a self,
        test: &'a TestIdentity,
        record: &'a TestApiRecordData,
    ) -> StoreFuture<'a, SaveOutcome> {
        Box::pin(async move {
            if record.test_state != Some(TestState::Passed) {
                debug!(test = %test.test_name(), "not saving a test that did not pass");
                return Ok(SaveOutcome::Skipped);
            }
            let path = self.path_for(test);
            let json = serde_json::to_string_pretty(record)?;
            self.fs.write(&path, &json)?;
            info!(
                path = %path.display(),
                calls = record.api_calls_in_this_test.len(),
                "saved recorded API calls"
            );
            Ok(SaveOutcome::Saved)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::LiveFileSystem;
    use crate::cassette::format::ApiCallRecord;
    use crate::store::testing::MemFs;
    use serde_json::json;

    fn test_id() -> TestIdentity {
        TestIdentity::new("e2e/add-todo.cy.js", ["todo app", "adds a todo"])
    }

    fn record(state: TestState) -> TestApiRecordData {
        let call = ApiCallRecord {
            method: "POST".into(),
            url: "/todos".into(),
            request: Some(json!({"title": "write code"})),
            response: Some(json!({"id": 1, "title": "write code"})),
            duration: 7,
        };
        TestApiRecordData::new(&test_id(), vec![call], Some(state))
    }

    #[test]
    fn file_name_joins_spec_and_title() {
        let store = LocalRecordStore::new(PathBuf::from("magic-backend"), Arc::new(MemFs::default()));
        assert_eq!(
            store.path_for(&test_id()),
            PathBuf::from("magic-backend/e2e/add-todo.cy.js_todo_app_adds_a_todo_api_calls.json")
        );
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let fs = Arc::new(MemFs::default());
        let store = LocalRecordStore::new(PathBuf::from("recordings"), fs.clone());
        let test = test_id();

        let outcome = store.save(&test, &record(TestState::Passed)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(fs.files.lock().unwrap().len(), 1);

        let loaded = store.load(&test).await.unwrap().unwrap().into_baseline().unwrap();
        assert_eq!(loaded, record(TestState::Passed));
    }

    #[tokio::test]
    async fn failed_tests_are_not_saved() {
        let fs = Arc::new(MemFs::default());
        let store = LocalRecordStore::new(PathBuf::from("recordings"), fs.clone());

        let outcome = store.save(&test_id(), &record(TestState::Failed)).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert!(fs.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_recording_is_none() {
        let store = LocalRecordStore::new(PathBuf::from("recordings"), Arc::new(MemFs::default()));
        assert!(store.load(&test_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_recording_is_an_error() {
        let fs = Arc::new(MemFs::default());
        let store = LocalRecordStore::new(PathBuf::from("recordings"), fs.clone());
        fs.write(&store.path_for(&test_id()), "not json").unwrap();
        assert!(store.load(&test_id()).await.is_err());
    }

    #[tokio::test]
    async fn writes_pretty_json_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalRecordStore::new(dir.path().to_path_buf(), Arc::new(LiveFileSystem));
        store.save(&test_id(), &record(TestState::Passed)).await.unwrap();

        let text = std::fs::read_to_string(store.path_for(&test_id())).unwrap();
        assert!(text.contains("\n  \"pluginName\": \"magic-backend\""));
        assert!(text.contains("\"testName\": \"todo app / adds a todo\""));
    }
}
