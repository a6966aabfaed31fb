//! Call matcher: decides what happens to every intercepted call.
//!
//! Interception is a two-phase contract so any host transport can drive
//! it:
//!
//! 1. [`CallMatcher::decide`] runs synchronously when a call is
//!    intercepted. It either short-circuits with a recorded response
//!    ([`Decision::Reply`]) or lets the call through
//!    ([`Decision::Continue`]).
//! 2. For calls that went through, the host awaits the real backend and
//!    hands the response to [`CallMatcher::observe`], which records or
//!    inspects it and returns the body the page should see.
//!
//! [`CallMatcher::handle`] drives both phases around an async forwarding
//! closure.

pub mod spec;

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cassette::format::{ApiCallRecord, Divergence, DivergenceKind, TestApiRecordData};
use crate::cassette::recorder::CallRecorder;
use crate::cassette::replayer::{CallReplayer, UrlCheck};
use crate::diff::diff_json;
use crate::error::{Error, Result};
use crate::mode::Mode;
use crate::ports::Clock;

pub use spec::{absolute_url, relative_url, InterceptSpec, InterceptSpecs};

/// A live call as seen by the host's interception point.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRequest {
    /// HTTP method.
    pub method: String,
    /// Full URL as requested by the page.
    pub url: String,
    /// Request body, if any.
    pub body: Option<Value>,
}

impl LiveRequest {
    /// Convenience constructor.
    pub fn new(method: impl Into<String>, url: impl Into<String>, body: Option<Value>) -> Self {
        Self { method: method.into(), url: url.into(), body }
    }
}

/// Outcome of the synchronous decide step.
#[derive(Debug)]
pub enum Decision {
    /// Answer the page with this body without contacting the backend.
    Reply(Option<Value>),
    /// Send the call to the backend, then pass the response to
    /// [`CallMatcher::observe`].
    Continue(PendingCall),
}

/// A call that was let through and awaits its real response.
#[derive(Debug)]
pub struct PendingCall {
    spec: usize,
    method: String,
    url: String,
    request: Option<Value>,
    started: DateTime<Utc>,
    baseline: Option<(usize, ApiCallRecord)>,
}

impl PendingCall {
    /// Index of the intercept spec the call belongs to.
    #[must_use]
    pub fn spec(&self) -> usize {
        self.spec
    }
}

/// Per-spec behaviour once the matcher is armed.
#[derive(Debug)]
enum Arm {
    PassThrough,
    Record,
    Replay(CallReplayer),
    Inspect(CallReplayer),
    Block,
}

/// Settings shared by every spec of one matcher.
#[derive(Debug, Clone)]
pub struct MatcherOptions {
    /// Base URL stripped from live URLs.
    pub base_url: Option<String>,
    /// Tolerated duration difference in INSPECT mode.
    pub duration_threshold_ms: u64,
    /// Full title of the running test, used in error messages.
    pub test_title: String,
}

/// Matches intercepted calls against the active mode and recording.
pub struct CallMatcher {
    mode: Option<Mode>,
    specs: Vec<InterceptSpec>,
    arms: Vec<Arm>,
    options: MatcherOptions,
    clock: Arc<dyn Clock>,
    recorder: CallRecorder,
}

impl CallMatcher {
    /// Arm one interceptor per spec for `mode`.
    ///
    /// `baseline` is the recording to replay or inspect against. When it is
    /// missing, PLAYBACK and INSPECT degrade to pass-through (check
    /// [`CallMatcher::mode`] afterwards) while PLAYBACK_ONLY arms
    /// interceptors that fail on the first call.
    #[must_use]
    pub fn arm(
        mode: Option<Mode>,
        specs: Vec<InterceptSpec>,
        baseline: Option<&TestApiRecordData>,
        options: MatcherOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (mode, arms) = match (mode, baseline) {
            (None, _) => (None, pass_through(&specs)),
            (Some(Mode::Recording), _) => {
                (Some(Mode::Recording), specs.iter().map(|_| Arm::Record).collect())
            }
            (Some(Mode::PlaybackOnly), None) => {
                warn!(test = %options.test_title, "no recorded API calls found for this test");
                (Some(Mode::PlaybackOnly), specs.iter().map(|_| Arm::Block).collect())
            }
            (Some(mode @ (Mode::Playback | Mode::Inspect)), None) => {
                info!(
                    %mode,
                    test = %options.test_title,
                    "no recorded API calls found, running normal test"
                );
                (None, pass_through(&specs))
            }
            (Some(mode), Some(recording)) => {
                let base_url = options.base_url.as_deref();
                let arms = partition(&specs, &recording.api_calls_in_this_test, base_url)
                    .into_iter()
                    .map(|calls| {
                        let replayer = CallReplayer::new(calls);
                        if mode == Mode::Inspect {
                            Arm::Inspect(replayer)
                        } else {
                            Arm::Replay(replayer)
                        }
                    })
                    .collect();
                (Some(mode), arms)
            }
        };
        debug!(mode = ?mode, specs = specs.len(), "armed call matcher");
        Self { mode, specs, arms, options, clock, recorder: CallRecorder::new() }
    }

    /// Mode in effect; `None` when the matcher passes everything through.
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// The configured specs.
    #[must_use]
    pub fn specs(&self) -> &[InterceptSpec] {
        &self.specs
    }

    /// First spec matching a call, for hosts without their own routing.
    /// `url` is the URL as requested, before the base URL is stripped.
    #[must_use]
    pub fn find_spec(&self, method: &str, url: &str) -> Option<usize> {
        self.specs.iter().position(|spec| spec.matches(method, url))
    }

    /// Phase one: decide what to do with an intercepted call.
    ///
    /// # Errors
    ///
    /// Returns a sequence error when the call does not fit the recording,
    /// [`Error::UnexpectedCallNoBaseline`] in PLAYBACK_ONLY mode without a
    /// recording, and [`Error::UnknownSpec`] for a spec index out of range.
    pub fn decide(&mut self, spec: usize, request: &LiveRequest) -> Result<Decision> {
        let url = relative_url(self.options.base_url.as_deref(), &request.url);
        let started = self.clock.now();
        let arm = self.arms.get_mut(spec).ok_or(Error::UnknownSpec(spec))?;

        let (baseline, short_circuit) = match arm {
            Arm::PassThrough | Arm::Record => (None, false),
            Arm::Block => {
                return Err(Error::UnexpectedCallNoBaseline {
                    method: request.method.clone(),
                    url: request.url.clone(),
                    test: self.options.test_title.clone(),
                });
            }
            Arm::Replay(replayer) => {
                let (index, recorded) = replayer.next_call(&request.method, &url, UrlCheck::Exact)?;
                (Some((index, recorded.clone())), true)
            }
            // recorded URLs may carry per-run fragments, only the method must agree
            Arm::Inspect(replayer) => {
                let (index, recorded) =
                    replayer.next_call(&request.method, &url, UrlCheck::Tolerant)?;
                (Some((index, recorded.clone())), false)
            }
        };

        if let Some((index, recorded)) = &baseline {
            if let Some(diff) = diff_json(recorded.request.as_ref(), request.body.as_ref()) {
                self.advise(spec, *index, &request.method, &url, DivergenceKind::Request { diff });
            }
        }

        if short_circuit {
            return Ok(Decision::Reply(baseline.and_then(|(_, recorded)| recorded.response)));
        }

        Ok(Decision::Continue(PendingCall {
            spec,
            method: request.method.clone(),
            url,
            request: request.body.clone(),
            started,
            baseline,
        }))
    }

    /// Phase two: record or inspect the real response of a call that was
    /// let through, returning the body to hand back to the page.
    pub fn observe(&mut self, pending: PendingCall, response: Option<Value>) -> Option<Value> {
        let duration = self.clock.millis_since(pending.started);

        let capture = matches!(self.arms.get(pending.spec), Some(Arm::Record | Arm::Inspect(_)));

        if let Some((index, recorded)) = &pending.baseline {
            if recorded.duration.abs_diff(duration) > self.options.duration_threshold_ms {
                self.advise(
                    pending.spec,
                    *index,
                    &pending.method,
                    &pending.url,
                    DivergenceKind::Duration { recorded: recorded.duration, current: duration },
                );
            }
            if let Some(diff) = diff_json(recorded.response.as_ref(), response.as_ref()) {
                self.advise(
                    pending.spec,
                    *index,
                    &pending.method,
                    &pending.url,
                    DivergenceKind::Response { diff },
                );
            }
        }

        if capture {
            self.recorder.record(ApiCallRecord {
                method: pending.method,
                url: pending.url,
                request: pending.request,
                response: response.clone(),
                duration,
            });
        }
        response
    }

    /// Drive both phases for one call. `forward` sends the call to the real
    /// backend and resolves to its response body.
    ///
    /// # Errors
    ///
    /// Returns any error from [`CallMatcher::decide`] or from `forward`.
    pub async fn handle<F, Fut>(
        &mut self,
        spec: usize,
        request: LiveRequest,
        forward: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce(LiveRequest) -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        match self.decide(spec, &request)? {
            Decision::Reply(body) => Ok(body),
            Decision::Continue(pending) => {
                let response = forward(request).await?;
                Ok(self.observe(pending, response))
            }
        }
    }

    /// Recorded calls not consumed yet, summed over every spec.
    #[must_use]
    pub fn unused_calls(&self) -> usize {
        self.arms
            .iter()
            .map(|arm| match arm {
                Arm::Replay(replayer) | Arm::Inspect(replayer) => replayer.remaining(),
                Arm::PassThrough | Arm::Record | Arm::Block => 0,
            })
            .sum()
    }

    /// Calls captured so far.
    #[must_use]
    pub fn recorder(&self) -> &CallRecorder {
        &self.recorder
    }

    /// Give up the captured calls and divergences.
    #[must_use]
    pub fn into_recorder(self) -> CallRecorder {
        self.recorder
    }

    fn advise(&mut self, spec: usize, index: usize, method: &str, url: &str, kind: DivergenceKind) {
        let divergence =
            Divergence { spec, index, method: method.to_string(), url: url.to_string(), kind };
        warn!(%divergence, "call diverged from recording");
        self.recorder.note(divergence);
    }
}

fn pass_through(specs: &[InterceptSpec]) -> Vec<Arm> {
    specs.iter().map(|_| Arm::PassThrough).collect()
}

/// Split recorded calls into one queue per spec. A lone spec owns every
/// call; otherwise each call goes to the first spec that matches it, judged
/// on the URL the page requested (recorded URLs are relative to `base_url`).
fn partition(
    specs: &[InterceptSpec],
    calls: &[ApiCallRecord],
    base_url: Option<&str>,
) -> Vec<Vec<ApiCallRecord>> {
    let mut queues = vec![Vec::new(); specs.len()];
    if let [_] = specs {
        queues[0] = calls.to_vec();
        return queues;
    }
    for call in calls {
        let url = absolute_url(base_url, &call.url);
        match specs.iter().position(|spec| spec.matches(&call.method, &url)) {
            Some(index) => queues[index].push(call.clone()),
            None => warn!(method = %call.method, url = %call.url, "recorded call matches no spec"),
        }
    }
    queues
}
