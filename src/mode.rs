//! Operating modes and the controller that resolves them per test.
//!
//! Users may spell modes loosely (`record`, `play`, `observe`, ...). Every
//! accepted spelling lives in [`MODE_ALIASES`]; anything else leaves the
//! mode unset and network calls pass through untouched.

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::config::MagicBackendConfig;
use crate::error::{Error, Result};

/// What the engine does with intercepted calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Let calls reach the backend and capture them.
    Recording,
    /// Answer calls from the recording; run normally when none exists.
    Playback,
    /// Answer calls from the recording; any call without one fails the test.
    PlaybackOnly,
    /// Let calls reach the backend and compare them with the recording.
    Inspect,
}

/// Every accepted spelling and the mode it stands for. Case-sensitive.
pub const MODE_ALIASES: &[(&str, Mode)] = &[
    ("record", Mode::Recording),
    ("recording", Mode::Recording),
    ("play", Mode::Playback),
    ("replay", Mode::Playback),
    ("playback", Mode::Playback),
    ("playback-only", Mode::PlaybackOnly),
    ("inspect", Mode::Inspect),
    ("inspecting", Mode::Inspect),
    ("observe", Mode::Inspect),
    ("observing", Mode::Inspect),
];

impl Mode {
    /// Looks an alias up in [`MODE_ALIASES`].
    #[must_use]
    pub fn from_alias(alias: &str) -> Option<Self> {
        MODE_ALIASES.iter().find(|(name, _)| *name == alias).map(|(_, mode)| *mode)
    }

    /// Canonical name; itself an accepted alias.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Playback => "playback",
            Self::PlaybackOnly => "playback-only",
            Self::Inspect => "inspect",
        }
    }

    /// Modes that need a prior recording before calls can be matched.
    #[must_use]
    pub fn needs_baseline(self) -> bool {
        !matches!(self, Self::Recording)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where recordings are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// One JSON file per test on the local disk.
    #[default]
    Local,
    /// A remote recording service that keeps history.
    Remote,
}

impl StorageMode {
    /// Canonical name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(Error::InvalidStore(other.to_string())),
        }
    }
}

/// Mode and storage resolved for the running test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedModes {
    /// Active mode, `None` for pass-through.
    pub mode: Option<Mode>,
    /// Active storage strategy.
    pub store: StorageMode,
}

/// Resolves the mode and storage for each test.
///
/// The controller remembers a locked mode across tests (the interactive
/// "lock" toggle) and the modes resolved for the current test. Both are
/// cleared by [`ModeController::reset`], which a host calls between
/// independent runs.
#[derive(Debug, Default)]
pub struct ModeController {
    locked: Option<Mode>,
    current: Option<ResolvedModes>,
}

impl ModeController {
    /// Create a controller with no locked mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a mode so it overrides the configured one for every later test.
    pub fn lock(&mut self, mode: Mode) {
        info!(mode = %mode, "locking mode");
        self.locked = Some(mode);
    }

    /// Remove the locked mode.
    pub fn unlock(&mut self) {
        self.locked = None;
    }

    /// The locked mode, if any.
    #[must_use]
    pub fn locked(&self) -> Option<Mode> {
        self.locked
    }

    /// Modes resolved by the last [`ModeController::begin_test`].
    #[must_use]
    pub fn current(&self) -> Option<ResolvedModes> {
        self.current
    }

    /// Forget the locked mode and the current test's modes.
    pub fn reset(&mut self) {
        self.locked = None;
        self.current = None;
    }

    /// Resolve a mode from a one-shot hint and an override.
    ///
    /// The override wins when present. Unknown hints resolve to `None`
    /// (pass-through) and are reported with a warning.
    #[must_use]
    pub fn resolve_mode(hint: Option<&str>, override_mode: Option<Mode>) -> Option<Mode> {
        if override_mode.is_some() {
            return override_mode;
        }
        let hint = hint?;
        let mode = Mode::from_alias(hint);
        if mode.is_none() {
            warn!(mode = hint, "unrecognized mode, network calls pass through");
        }
        mode
    }

    /// Resolve the storage strategy, `local` when no hint is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStore`] for any hint other than `local` or
    /// `remote`.
    pub fn resolve_storage(hint: Option<&str>) -> Result<StorageMode> {
        hint.map_or(Ok(StorageMode::Local), str::parse)
    }

    /// Resolve both modes for a new test and remember them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStore`] when the configured store is invalid.
    pub fn begin_test(&mut self, config: &MagicBackendConfig) -> Result<ResolvedModes> {
        self.current = None;
        let resolved = ResolvedModes {
            mode: Self::resolve_mode(config.mode.as_deref(), self.locked),
            store: Self::resolve_storage(config.store.as_deref())?,
        };
        self.current = Some(resolved);
        Ok(resolved)
    }

    /// Drop the current test's mode, keeping its storage, after the test
    /// fell back to pass-through. The next test resolves afresh.
    pub fn clear_mode(&mut self) {
        if let Some(current) = self.current.as_mut() {
            info!(mode = ?current.mode, "clearing mode for this test");
            current.mode = None;
        }
    }

    /// Clear the current test's modes.
    pub fn end_test(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_alias_maps_to_one_mode() {
        assert_eq!(Mode::from_alias("record"), Some(Mode::Recording));
        assert_eq!(Mode::from_alias("replay"), Some(Mode::Playback));
        assert_eq!(Mode::from_alias("play"), Some(Mode::Playback));
        assert_eq!(Mode::from_alias("playback-only"), Some(Mode::PlaybackOnly));
        assert_eq!(Mode::from_alias("observing"), Some(Mode::Inspect));
        assert_eq!(Mode::from_alias("Record"), None);
        assert_eq!(Mode::from_alias("playing"), None);
        assert_eq!(Mode::from_alias("fast-forward"), None);
    }

    #[test]
    fn normalization_is_idempotent() {
        for (alias, mode) in MODE_ALIASES {
            let canonical = Mode::from_alias(alias).unwrap();
            assert_eq!(canonical, *mode);
            assert_eq!(Mode::from_alias(canonical.as_str()), Some(canonical));
        }
    }

    #[test]
    fn override_beats_hint() {
        assert_eq!(
            ModeController::resolve_mode(Some("record"), Some(Mode::Inspect)),
            Some(Mode::Inspect)
        );
        assert_eq!(ModeController::resolve_mode(Some("record"), None), Some(Mode::Recording));
        assert_eq!(ModeController::resolve_mode(Some("rewind"), None), None);
        assert_eq!(ModeController::resolve_mode(None, None), None);
    }

    #[test]
    fn storage_defaults_to_local_and_rejects_unknown() {
        assert_eq!(ModeController::resolve_storage(None).unwrap(), StorageMode::Local);
        assert_eq!(ModeController::resolve_storage(Some("remote")).unwrap(), StorageMode::Remote);
        assert!(matches!(
            ModeController::resolve_storage(Some("s3")),
            Err(Error::InvalidStore(store)) if store == "s3"
        ));
    }

    #[test]
    fn locked_mode_applies_until_reset() {
        let config = MagicBackendConfig { mode: Some("replay".into()), ..Default::default() };
        let mut controller = ModeController::new();

        controller.lock(Mode::Recording);
        let resolved = controller.begin_test(&config).unwrap();
        assert_eq!(resolved.mode, Some(Mode::Recording));
        assert_eq!(controller.current(), Some(resolved));

        controller.reset();
        assert_eq!(controller.locked(), None);
        assert_eq!(controller.current(), None);
        assert_eq!(controller.begin_test(&config).unwrap().mode, Some(Mode::Playback));
    }

    #[test]
    fn invalid_store_fails_test_start() {
        let config = MagicBackendConfig { store: Some("cloud".into()), ..Default::default() };
        let mut controller = ModeController::new();
        assert!(controller.begin_test(&config).is_err());
        assert_eq!(controller.current(), None);
    }

    #[test]
    fn cleared_mode_lasts_one_test() {
        let config = MagicBackendConfig { mode: Some("replay".into()), ..Default::default() };
        let mut controller = ModeController::new();

        controller.begin_test(&config).unwrap();
        controller.clear_mode();
        let current = controller.current().unwrap();
        assert_eq!(current.mode, None);
        assert_eq!(current.store, StorageMode::Local);

        controller.end_test();
        assert_eq!(controller.begin_test(&config).unwrap().mode, Some(Mode::Playback));
    }
}
