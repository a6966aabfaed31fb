//! User-facing configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::intercept::spec::InterceptSpecs;

/// Environment variable holding a one-shot mode hint.
pub const MODE_ENV: &str = "MAGIC_BACKEND_MODE";
/// Environment variable holding the remote store credential.
pub const API_KEY_ENV: &str = "MAGIC_BACKEND_API_KEY";

/// Default tolerated duration difference in INSPECT mode.
pub const DEFAULT_DURATION_THRESHOLD_MS: u64 = 500;
/// Default directory for local recordings.
pub const DEFAULT_RECORDINGS_DIR: &str = "magic-backend";

/// Configuration for recording, replay and inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicBackendConfig {
    /// Mode alias, see [`crate::mode::MODE_ALIASES`].
    pub mode: Option<String>,
    /// `local` or `remote`; `local` when unset.
    pub store: Option<String>,
    /// Which calls to intercept; nothing is intercepted when unset.
    pub api_calls_to_intercept: Option<InterceptSpecs>,
    /// Duration difference (ms) tolerated in INSPECT mode.
    pub api_call_duration_difference_threshold: Option<u64>,
    /// Base URL stripped from intercepted URLs before storing or comparing.
    pub base_url: Option<String>,
    /// Directory holding local recordings.
    pub recordings_dir: Option<PathBuf>,
    /// Endpoint of the remote recording service.
    pub remote_url: Option<String>,
}

impl MagicBackendConfig {
    /// Load configuration from a `.json`, `.yaml` or `.yml` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or has an
    /// unsupported extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Err(Error::Config(format!(
                "unsupported config file {}, expected .json, .yaml or .yml",
                path.display()
            ))),
        }
    }

    /// Apply environment overrides: a non-empty `MAGIC_BACKEND_MODE`
    /// replaces the configured mode.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Some(mode) = std::env::var(MODE_ENV).ok().filter(|m| !m.is_empty()) {
            self.mode = Some(mode);
        }
        self
    }

    /// Tolerated duration difference, 500 ms by default.
    #[must_use]
    pub fn duration_threshold_ms(&self) -> u64 {
        self.api_call_duration_difference_threshold.unwrap_or(DEFAULT_DURATION_THRESHOLD_MS)
    }

    /// Directory for local recordings.
    #[must_use]
    pub fn recordings_dir(&self) -> PathBuf {
        self.recordings_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDINGS_DIR))
    }

    /// Returns `true` when at least one call pattern is configured.
    #[must_use]
    pub fn intercepts_anything(&self) -> bool {
        self.api_calls_to_intercept.as_ref().is_some_and(|specs| !specs.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MagicBackendConfig::default();
        assert_eq!(config.duration_threshold_ms(), 500);
        assert_eq!(config.recordings_dir(), PathBuf::from("magic-backend"));
        assert!(!config.intercepts_anything());
    }

    #[test]
    fn loads_yaml_with_single_intercept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("magic-backend.yaml");
        std::fs::write(
            &path,
            "mode: replay\nstore: local\napiCallsToIntercept:\n  method: '*'\n  pathname: '/todos{/*,}'\n\
             apiCallDurationDifferenceThreshold: 250\n",
        )
        .unwrap();

        let config = MagicBackendConfig::load(&path).unwrap();
        assert_eq!(config.mode.as_deref(), Some("replay"));
        assert_eq!(config.duration_threshold_ms(), 250);
        let specs = config.api_calls_to_intercept.unwrap().into_vec();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].pathname.as_deref(), Some("/todos{/*,}"));
    }

    #[test]
    fn loads_json_with_intercept_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("magic-backend.json");
        std::fs::write(
            &path,
            r#"{
                "apiCallsToIntercept": [
                    {"method": "GET", "pathname": "/todos"},
                    {"method": "POST", "pathname": "/todos"}
                ],
                "baseUrl": "http://localhost:3000"
            }"#,
        )
        .unwrap();

        let config = MagicBackendConfig::load(&path).unwrap();
        assert!(config.intercepts_anything());
        assert_eq!(config.api_calls_to_intercept.unwrap().into_vec().len(), 2);
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn empty_intercept_list_intercepts_nothing() {
        let config: MagicBackendConfig =
            serde_json::from_str(r#"{"apiCallsToIntercept": []}"#).unwrap();
        assert!(!config.intercepts_anything());
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("magic-backend.toml");
        std::fs::write(&path, "mode = 'record'").unwrap();
        assert!(matches!(MagicBackendConfig::load(&path), Err(Error::Config(_))));
    }
}
