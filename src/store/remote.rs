//! Remote strategy: a recording service that keeps every attempt.
//!
//! Saves go to `POST {base}/records` and expect `201 Created`. Loads use
//! `GET {base}/records` with the test identity as a JSON body; in history
//! mode (`?all=true`) the service answers with every attempt, otherwise with
//! the latest one. `404` means nothing was recorded yet.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

use super::{RecordStore, SaveOutcome, StoreFuture};
use crate::cassette::format::{
    ApiCallRecord, Divergence, LoadedRecord, TestApiRecordData, TestIdentity, TestState,
};
use crate::error::Error;
use crate::mode::StorageMode;
use crate::ports::Clock;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-magic-backend-api-key";

/// HTTP client for the recording service.
pub struct RemoteRecordStore {
    client: Client,
    base_url: String,
    api_key: String,
    history: bool,
    clock: Arc<dyn Clock>,
}

impl RemoteRecordStore {
    /// Creates a store talking to `base_url`, loading full history.
    #[must_use]
    pub fn new(base_url: String, api_key: String, clock: Arc<dyn Clock>) -> Self {
        Self::with_client(Client::new(), base_url, api_key, clock)
    }

    /// Like [`RemoteRecordStore::new`] with a caller-built client.
    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: String,
        api_key: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { client, base_url, api_key, history: true, clock }
    }

    /// Load only the latest attempt instead of the full history.
    #[must_use]
    pub fn latest_only(mut self) -> Self {
        self.history = false;
        self
    }

    fn records_url(&self) -> String {
        format!("{}/records", self.base_url)
    }
}

/// Body identifying a test when loading.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadRequest<'a> {
    spec_name: &'a str,
    test_title: String,
}

/// Body of a save.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a> {
    spec_name: &'a str,
    test_title: &'a str,
    api_calls: &'a [ApiCallRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    test_state: Option<TestState>,
    #[serde(skip_serializing_if = "<[Divergence]>::is_empty")]
    divergences: &'a [Divergence],
    meta: SaveMeta<'a>,
}

/// Who wrote a recording, and when.
#[derive(Serialize)]
struct SaveMeta<'a> {
    plugin: &'a str,
    version: &'a str,
    date: String,
}

impl RecordStore for RemoteRecordStore {
    fn kind(&self) -> StorageMode {
        StorageMode::Remote
    }

    fn retains_history(&self) -> bool {
        true
    }

    fn load<'a>(&'a self, test: &'a TestIdentity) -> StoreFuture<'a, Option<LoadedRecord>> {
        Box::pin(async move {
            let body = LoadRequest { spec_name: &test.spec_name, test_title: test.test_name() };
            let mut request =
                self.client.get(self.records_url()).header(API_KEY_HEADER, &self.api_key);
            if self.history {
                request = request.query(&[("all", "true")]);
            }
            let response = request.json(&body).send().await?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                debug!(test = %body.test_title, "no remote recording");
                return Ok(None);
            }
            let text = response.text().await?;
            if status != StatusCode::OK {
                return Err(Error::RemoteStatus {
                    status: status.as_u16(),
                    expected: 200,
                    body: text,
                });
            }
            Ok(Some(serde_json::from_str(&text)?))
        })
    }

    fn save<'a>(
        &'a self,
        test: &'a TestIdentity,
        record: &'a TestApiRecordData,
    ) -> StoreFuture<'a, SaveOutcome> {
        Box::pin(async move {
            let body = SaveRequest {
                spec_name: &record.spec_name,
                test_title: &record.test_name,
                api_calls: &record.api_calls_in_this_test,
                test_state: record.test_state,
                divergences: &record.divergences,
                meta: SaveMeta {
                    plugin: &record.plugin_name,
                    version: &record.plugin_version,
                    date: self.clock.now().to_rfc3339(),
                },
            };
            let response = self
                .client
                .post(self.records_url())
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::CREATED {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::RemoteStatus {
                    status: status.as_u16(),
                    expected: 201,
                    body: text,
                });
            }
            info!(
                spec = %record.spec_name,
                test = %test.test_name(),
                state = ?record.test_state,
                "saved recorded API calls remotely"
            );
            Ok(SaveOutcome::Saved)
        })
    }
}
