//! Recording data structures persisted by the storage strategies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single captured API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiCallRecord {
    /// HTTP method, upper case.
    pub method: String,
    /// URL relative to the configured base URL.
    pub url: String,
    /// Request body, absent for body-less requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<serde_json::Value>,
    /// Response body, absent when the backend sent none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    /// Round-trip time in milliseconds.
    pub duration: u64,
}

/// Outcome of a finished test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestState {
    /// The test passed.
    Passed,
    /// The test failed.
    Failed,
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        })
    }
}

/// Identity of one test: the spec file it lives in and its title path
/// (describe blocks followed by the test title).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    /// Spec file path relative to the project, e.g. `e2e/add-todo.cy.js`.
    pub spec_name: String,
    /// Titles from the outermost suite down to the test itself.
    pub title_path: Vec<String>,
}

impl TestIdentity {
    /// Creates an identity from a spec name and title path.
    pub fn new<I, S>(spec_name: impl Into<String>, title_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spec_name: spec_name.into(),
            title_path: title_path.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable full title, `suite / test`.
    #[must_use]
    pub fn test_name(&self) -> String {
        self.title_path.join(" / ")
    }

    /// File-name friendly title: parts joined by `_`, spaces replaced by `_`.
    #[must_use]
    pub fn file_title(&self) -> String {
        self.title_path.join("_").replace(' ', "_")
    }
}

/// Which body or metric diverged from the recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DivergenceKind {
    /// The live request body differs structurally from the recorded one.
    Request {
        /// Diff engine explanation.
        diff: String,
    },
    /// The live response body differs structurally from the recorded one.
    Response {
        /// Diff engine explanation.
        diff: String,
    },
    /// The call took noticeably more or less time than recorded.
    Duration {
        /// Recorded duration in milliseconds.
        recorded: u64,
        /// Live duration in milliseconds.
        current: u64,
    },
}

/// An advisory difference between a live call and its recording.
///
/// Divergences never fail a test. They are logged as they happen and kept
/// on the recording for later review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Divergence {
    /// Index of the intercept spec that saw the call.
    pub spec: usize,
    /// Position of the call within that spec's sequence.
    pub index: usize,
    /// Live method.
    pub method: String,
    /// Live relative URL.
    pub url: String,
    /// What diverged.
    #[serde(flatten)]
    pub kind: DivergenceKind,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DivergenceKind::Request { diff } => {
                write!(f, "request \"{} {}\" {diff}", self.method, self.url)
            }
            DivergenceKind::Response { diff } => {
                write!(f, "response \"{} {}\" {diff}", self.method, self.url)
            }
            DivergenceKind::Duration { recorded, current } => {
                let direction = if recorded > current { "faster" } else { "slower" };
                write!(
                    f,
                    "{} {} became {direction}: time went from {recorded}ms to {current}ms",
                    self.method, self.url
                )
            }
        }
    }
}

/// Everything recorded for one test execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestApiRecordData {
    /// Name of the tool that wrote the recording.
    #[serde(default)]
    pub plugin_name: String,
    /// Version of the tool that wrote the recording.
    #[serde(default)]
    pub plugin_version: String,
    /// Spec file the test lives in.
    pub spec_name: String,
    /// Full test title, `suite / test`.
    #[serde(alias = "testTitle")]
    pub test_name: String,
    /// Captured calls in arrival order.
    #[serde(alias = "apiCalls")]
    pub api_calls_in_this_test: Vec<ApiCallRecord>,
    /// Outcome of the test, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_state: Option<TestState>,
    /// Advisory divergences observed while the calls were captured.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub divergences: Vec<Divergence>,
}

impl TestApiRecordData {
    /// Builds a recording stamped with this crate's name and version.
    #[must_use]
    pub fn new(
        test: &TestIdentity,
        calls: Vec<ApiCallRecord>,
        test_state: Option<TestState>,
    ) -> Self {
        Self {
            plugin_name: env!("CARGO_PKG_NAME").to_string(),
            plugin_version: env!("CARGO_PKG_VERSION").to_string(),
            spec_name: test.spec_name.clone(),
            test_name: test.test_name(),
            api_calls_in_this_test: calls,
            test_state,
            divergences: Vec::new(),
        }
    }
}

/// What a store hands back: one recording, or every retained attempt in
/// chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LoadedRecord {
    /// A single recording.
    Single(TestApiRecordData),
    /// Historical attempts, oldest first.
    History(Vec<TestApiRecordData>),
}

impl LoadedRecord {
    /// Picks the recording to replay against.
    ///
    /// A single recording is used as-is. From history, the most recent
    /// attempt that passed wins; `None` if no attempt passed.
    #[must_use]
    pub fn into_baseline(self) -> Option<TestApiRecordData> {
        match self {
            Self::Single(record) => Some(record),
            Self::History(records) => {
                records.into_iter().rev().find(|r| r.test_state == Some(TestState::Passed))
            }
        }
    }

    /// Every recording as a list, oldest first.
    #[must_use]
    pub fn into_history(self) -> Vec<TestApiRecordData> {
        match self {
            Self::Single(record) => vec![record],
            Self::History(records) => records,
        }
    }
}
