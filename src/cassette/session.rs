//! Recording session: one test at a time, from mode resolution to save.
//!
//! A host drives the session through the test lifecycle:
//!
//! ```text
//! begin_test ──► handle / decide+observe (per call) ──► finish_test | abort_test
//! ```
//!
//! and calls [`RecordingSession::shutdown`] when the run ends.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::format::{Divergence, TestApiRecordData, TestIdentity, TestState};
use crate::config::MagicBackendConfig;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::intercept::{CallMatcher, LiveRequest, MatcherOptions};
use crate::mode::{Mode, ModeController, ResolvedModes};
use crate::report::{self, InspectReport};
use crate::store::{load_baseline, load_with_history, SaveOutcome};

/// Per-run state shared by every test.
pub struct RecordingSession {
    config: MagicBackendConfig,
    ctx: ServiceContext,
    controller: ModeController,
}

/// State of the running test.
pub struct TestContext {
    test: TestIdentity,
    modes: ResolvedModes,
    matcher: Option<CallMatcher>,
    history: Vec<TestApiRecordData>,
}

/// What happened during a finished test.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishReport {
    /// Mode the test actually ran in; `None` for pass-through.
    pub mode: Option<Mode>,
    /// Outcome reported by the host.
    pub state: TestState,
    /// Save result, `None` when the mode does not save.
    pub saved: Option<SaveOutcome>,
    /// Calls captured during the test.
    pub calls: usize,
    /// Advisory divergences noticed during the test.
    pub divergences: Vec<Divergence>,
    /// Recorded calls the test never made.
    pub unused_calls: usize,
    /// Comparison against earlier attempts, INSPECT only.
    pub report: Option<InspectReport>,
}

impl RecordingSession {
    /// Creates a session over `ctx`.
    #[must_use]
    pub fn new(config: MagicBackendConfig, ctx: ServiceContext) -> Self {
        Self { config, ctx, controller: ModeController::new() }
    }

    /// The session configuration.
    #[must_use]
    pub fn config(&self) -> &MagicBackendConfig {
        &self.config
    }

    /// Lock `mode` for every following test, overriding the configuration.
    pub fn lock(&mut self, mode: Mode) {
        self.controller.lock(mode);
    }

    /// Go back to the configured mode.
    pub fn unlock(&mut self) {
        self.controller.unlock();
    }

    /// Modes of the running test, if any.
    #[must_use]
    pub fn current(&self) -> Option<ResolvedModes> {
        self.controller.current()
    }

    /// Start a test: resolve its modes, load its recording when the mode
    /// needs one, and arm the interceptors.
    ///
    /// Without any configured intercepts the test runs untouched.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid or unavailable store.
    /// Missing or unreadable recordings are not errors.
    pub async fn begin_test(&mut self, test: TestIdentity) -> Result<TestContext> {
        let mut modes = self.controller.begin_test(&self.config)?;
        info!(
            test = %test.test_name(),
            mode = modes.mode.map_or("pass-through", Mode::as_str),
            store = %modes.store,
            "starting test"
        );

        let specs = match &self.config.api_calls_to_intercept {
            Some(specs) if !specs.is_empty() => specs.clone().into_vec(),
            _ => {
                debug!("no API calls to intercept");
                return Ok(TestContext { test, modes, matcher: None, history: Vec::new() });
            }
        };

        let store = self.ctx.store(modes.store)?;
        let (baseline, history) = match modes.mode {
            Some(Mode::Inspect) => load_with_history(store, &test).await,
            Some(mode) if mode.needs_baseline() => (load_baseline(store, &test).await, Vec::new()),
            _ => (None, Vec::new()),
        };

        let options = MatcherOptions {
            base_url: self.config.base_url.clone(),
            duration_threshold_ms: self.config.duration_threshold_ms(),
            test_title: test.test_name(),
        };
        let matcher =
            CallMatcher::arm(modes.mode, specs, baseline.as_ref(), options, self.ctx.clock.clone());
        if matcher.mode() != modes.mode {
            self.controller.clear_mode();
            modes.mode = matcher.mode();
        }
        Ok(TestContext { test, modes, matcher: Some(matcher), history })
    }

    /// End a test and persist what the mode calls for.
    ///
    /// RECORDING saves a passing test that made at least one call. INSPECT
    /// saves every attempt, but only to a store that keeps history. The
    /// playback modes save nothing and report unused recorded calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the recording cannot be saved.
    pub async fn finish_test(
        &mut self,
        test: TestContext,
        state: TestState,
    ) -> Result<FinishReport> {
        self.controller.end_test();
        let TestContext { test, modes, matcher, history } = test;
        let Some(matcher) = matcher else {
            return Ok(FinishReport {
                mode: None,
                state,
                saved: None,
                calls: 0,
                divergences: Vec::new(),
                unused_calls: 0,
                report: None,
            });
        };

        let mode = matcher.mode();
        let unused_calls = matcher.unused_calls();
        let record = matcher.into_recorder().finish(&test, Some(state));
        let calls = record.api_calls_in_this_test.len();
        let store = self.ctx.store(modes.store)?;

        let saved = match mode {
            Some(Mode::Recording) if state == TestState::Passed && calls > 0 => {
                Some(store.save(&test, &record).await?)
            }
            Some(Mode::Recording) => {
                info!(test = %test.test_name(), %state, calls, "nothing to save");
                None
            }
            Some(Mode::Inspect) if store.retains_history() => {
                Some(store.save(&test, &record).await?)
            }
            _ => None,
        };

        if matches!(mode, Some(Mode::Playback | Mode::PlaybackOnly)) && unused_calls > 0 {
            warn!(
                test = %test.test_name(),
                unused_calls,
                "test did not make every recorded API call"
            );
        }

        let report = (mode == Some(Mode::Inspect)).then(|| {
            let report = report::build(&history, &record.api_calls_in_this_test);
            info!(failed = report.has_failures, "\n{}", report.text);
            report
        });

        Ok(FinishReport {
            mode,
            state,
            saved,
            calls,
            divergences: record.divergences,
            unused_calls,
            report,
        })
    }

    /// Drop a test without saving anything.
    pub fn abort_test(&mut self, test: TestContext) {
        debug!(test = %test.test.test_name(), "aborting test");
        self.controller.end_test();
    }

    /// End the run: forget the locked mode.
    pub fn shutdown(&mut self) {
        self.controller.reset();
    }
}

impl TestContext {
    /// The running test.
    #[must_use]
    pub fn test(&self) -> &TestIdentity {
        &self.test
    }

    /// Modes in effect for the test, after any fallback to pass-through.
    #[must_use]
    pub fn modes(&self) -> ResolvedModes {
        self.modes
    }

    /// Mode in effect after arming; `None` when calls pass through.
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        self.matcher.as_ref().and_then(CallMatcher::mode)
    }

    /// The armed matcher, `None` when nothing is intercepted.
    pub fn matcher(&mut self) -> Option<&mut CallMatcher> {
        self.matcher.as_mut()
    }

    /// Route one call: find its spec and let the matcher handle it.
    /// Calls no spec matches go straight to `forward`.
    ///
    /// # Errors
    ///
    /// Returns any sequence error from the matcher or error from `forward`.
    pub async fn handle<F, Fut>(
        &mut self,
        request: LiveRequest,
        forward: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce(LiveRequest) -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        let Some(matcher) = self.matcher.as_mut() else {
            return forward(request).await;
        };
        match matcher.find_spec(&request.method, &request.url) {
            Some(spec) => matcher.handle(spec, request, forward).await,
            None => forward(request).await,
        }
    }
}
