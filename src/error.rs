//! Error types shared by the engine and the CLI.

use thiserror::Error;

/// Result type alias using the crate [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while recording, replaying or persisting calls.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration errors (raised at setup) ===
    /// The `store` option names a strategy that does not exist.
    #[error("magic-backend: Invalid store \"{0}\", expected \"local\" or \"remote\"")]
    InvalidStore(String),

    /// Remote storage was selected without a credential.
    #[error(
        "magic-backend: you set the store option to \"remote\", \
         but are missing the {0} environment variable"
    )]
    MissingApiKey(&'static str),

    /// Remote storage was selected without an endpoint.
    #[error("magic-backend: you set the store option to \"remote\", but \"remoteUrl\" is not set")]
    MissingRemoteUrl,

    /// The configuration file could not be understood.
    #[error("magic-backend: invalid configuration: {0}")]
    Config(String),

    // === Sequence errors (fatal for the current test) ===
    /// More live calls arrived than were recorded.
    #[error("Ran out of recorded API calls at index {index}")]
    SequenceExhausted {
        /// Position of the live call that found nothing to consume.
        index: usize,
    },

    /// The live call used a different HTTP method than the recording.
    #[error("Expected method {expected} but got {actual} (call index {index})")]
    MethodMismatch {
        /// Position of the call in its sequence.
        index: usize,
        /// Recorded method.
        expected: String,
        /// Live method.
        actual: String,
    },

    /// The live call targeted a different relative URL than the recording.
    #[error("Expected URL {expected} but got {actual} (call index {index})")]
    UrlMismatch {
        /// Position of the call in its sequence.
        index: usize,
        /// Recorded relative URL.
        expected: String,
        /// Live relative URL.
        actual: String,
    },

    /// A call reached a playback-only interceptor for a test without a recording.
    #[error(
        "Playback only: intercepted an unexpected API call {method} {url} \
         but test \"{test}\" has no recorded API calls"
    )]
    UnexpectedCallNoBaseline {
        /// Live method.
        method: String,
        /// Live URL.
        url: String,
        /// Full title of the running test.
        test: String,
    },

    /// The host referred to an intercept spec the matcher was not armed with.
    #[error("no intercept spec at index {0}")]
    UnknownSpec(usize),

    // === Transport errors ===
    /// The remote store answered with an unexpected status.
    #[error("remote store returned status {status}, expected {expected}: {body}")]
    RemoteStatus {
        /// Status received.
        status: u16,
        /// Status required for success.
        expected: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The HTTP request itself failed.
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),

    // === Plumbing ===
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decoding failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns `true` for errors that must abort the running test.
    #[must_use]
    pub fn is_sequence_error(&self) -> bool {
        matches!(
            self,
            Self::SequenceExhausted { .. }
                | Self::MethodMismatch { .. }
                | Self::UrlMismatch { .. }
                | Self::UnexpectedCallNoBaseline { .. }
        )
    }
}
