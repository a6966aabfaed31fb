//! In-memory buffer of the calls captured during one test.

use super::format::{ApiCallRecord, Divergence, TestApiRecordData, TestIdentity, TestState};

/// Collects captured calls and advisory divergences in arrival order.
///
/// A recorder lives exactly as long as one test; the session creates a
/// fresh one at test start and turns it into a [`TestApiRecordData`] at
/// test end.
#[derive(Debug, Default)]
pub struct CallRecorder {
    calls: Vec<ApiCallRecord>,
    divergences: Vec<Divergence>,
}

impl CallRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a captured call.
    pub fn record(&mut self, call: ApiCallRecord) {
        self.calls.push(call);
    }

    /// Append an advisory divergence.
    pub fn note(&mut self, divergence: Divergence) {
        self.divergences.push(divergence);
    }

    /// Calls captured so far.
    #[must_use]
    pub fn calls(&self) -> &[ApiCallRecord] {
        &self.calls
    }

    /// Divergences noted so far.
    #[must_use]
    pub fn divergences(&self) -> &[Divergence] {
        &self.divergences
    }

    /// Number of captured calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// Returns `true` when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Finish recording and build the persistable recording.
    #[must_use]
    pub fn finish(self, test: &TestIdentity, state: Option<TestState>) -> TestApiRecordData {
        let mut data = TestApiRecordData::new(test, self.calls, state);
        data.divergences = self.divergences;
        data
    }
}
