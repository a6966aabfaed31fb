//! Serves recorded calls back in order, one cursor per intercept spec.

use tracing::debug;

use super::format::ApiCallRecord;
use crate::error::{Error, Result};

/// How strictly a live URL must match the recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlCheck {
    /// The relative URL must be identical.
    Exact,
    /// Any URL is accepted; recorded URLs may contain per-run fragments.
    Tolerant,
}

/// Replays the recorded calls of a single intercept spec.
///
/// Calls are consumed strictly in FIFO order; the cursor only advances.
#[derive(Debug, Clone)]
pub struct CallReplayer {
    calls: Vec<ApiCallRecord>,
    cursor: usize,
}

impl CallReplayer {
    /// Create a replayer over the given recorded calls.
    #[must_use]
    pub fn new(calls: Vec<ApiCallRecord>) -> Self {
        Self { calls, cursor: 0 }
    }

    /// Consume the next recorded call, checking it against the live method
    /// and relative URL.
    ///
    /// The cursor advances once a recorded call exists at its position, even
    /// when the method or URL then fails to match.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SequenceExhausted`] when every recorded call has been
    /// consumed, [`Error::MethodMismatch`] when the methods differ and
    /// [`Error::UrlMismatch`] when `url_check` is exact and the URLs differ.
    pub fn next_call(
        &mut self,
        method: &str,
        url: &str,
        url_check: UrlCheck,
    ) -> Result<(usize, &ApiCallRecord)> {
        let index = self.cursor;
        let Some(recorded) = self.calls.get(index) else {
            return Err(Error::SequenceExhausted { index });
        };
        self.cursor += 1;

        if !recorded.method.eq_ignore_ascii_case(method) {
            return Err(Error::MethodMismatch {
                index,
                expected: recorded.method.clone(),
                actual: method.to_string(),
            });
        }
        if url_check == UrlCheck::Exact && recorded.url != url {
            return Err(Error::UrlMismatch {
                index,
                expected: recorded.url.clone(),
                actual: url.to_string(),
            });
        }

        debug!(index, method, url, "matched recorded call");
        Ok((index, recorded))
    }

    /// Position of the next call to consume.
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Recorded calls not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.calls.len().saturating_sub(self.cursor)
    }

    /// Returns `true` once every recorded call was consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
