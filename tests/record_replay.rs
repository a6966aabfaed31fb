//! Record-replay round trip through a real HTTP backend.
//!
//! 1. Record a test against a mock backend, saving to local files.
//! 2. Replay it with the backend switched off and assert identical bodies.
//! 3. Inspect it against a backend whose answers changed and assert the
//!    divergences are reported but do not fail the test.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use magic_backend::adapters::live::LiveFileSystem;
use magic_backend::adapters::manual::ManualClock;
use magic_backend::cassette::format::{DivergenceKind, TestIdentity, TestState};
use magic_backend::cassette::session::{RecordingSession, TestContext};
use magic_backend::config::MagicBackendConfig;
use magic_backend::context::ServiceContext;
use magic_backend::intercept::{InterceptSpec, InterceptSpecs, LiveRequest};
use magic_backend::mode::Mode;
use magic_backend::store::SaveOutcome;
use magic_backend::Error;

fn config(mode: &str, base_url: &str, dir: &std::path::Path) -> MagicBackendConfig {
    MagicBackendConfig {
        mode: Some(mode.into()),
        api_calls_to_intercept: Some(InterceptSpecs::Many(vec![
            InterceptSpec::new("GET", "/todos"),
            InterceptSpec::new("POST", "/todos"),
        ])),
        base_url: Some(base_url.into()),
        recordings_dir: Some(dir.to_path_buf()),
        ..MagicBackendConfig::default()
    }
}

fn session(config: MagicBackendConfig) -> RecordingSession {
    let clock = Arc::new(ManualClock::default());
    let ctx = ServiceContext::new(&config, clock, Arc::new(LiveFileSystem)).unwrap();
    RecordingSession::new(config, ctx)
}

fn test_id() -> TestIdentity {
    TestIdentity::new("e2e/add-todo.cy.js", ["todo app", "adds a todo"])
}

/// Send a call to the real backend.
async fn forward(request: LiveRequest) -> Result<Option<Value>, Error> {
    let client = reqwest::Client::builder().no_proxy().build()?;
    let builder = match request.method.as_str() {
        "POST" => client.post(&request.url),
        _ => client.get(&request.url),
    };
    let builder = match &request.body {
        Some(body) => builder.json(body),
        None => builder,
    };
    let text = builder.send().await?.text().await?;
    Ok((!text.is_empty()).then(|| serde_json::from_str(&text)).transpose()?)
}

/// The page under test: load the list, add a todo, load the list again.
async fn add_todo(test: &mut TestContext, base: &str) -> Result<Vec<Option<Value>>, Error> {
    let mut bodies = Vec::new();
    bodies.push(test.handle(LiveRequest::new("GET", format!("{base}/todos"), None), forward).await?);
    let todo = json!({"title": "write code", "completed": false});
    bodies.push(
        test.handle(LiveRequest::new("POST", format!("{base}/todos"), Some(todo)), forward).await?,
    );
    bodies.push(test.handle(LiveRequest::new("GET", format!("{base}/todos"), None), forward).await?);
    Ok(bodies)
}

async fn backend(list_after: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_after))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/todos"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": 1, "title": "write code", "completed": false})),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn record_then_replay_then_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let server = backend(json!([{"id": 1, "title": "write code", "completed": false}])).await;
    let base = server.uri();

    // --- Record ---
    let mut recording = session(config("record", &base, dir.path()));
    let mut test = recording.begin_test(test_id()).await.unwrap();
    assert_eq!(test.mode(), Some(Mode::Recording));
    let recorded_bodies = add_todo(&mut test, &base).await.unwrap();
    let report = recording.finish_test(test, TestState::Passed).await.unwrap();
    assert_eq!(report.saved, Some(SaveOutcome::Saved));
    assert_eq!(report.calls, 3);

    let file = dir.path().join("e2e/add-todo.cy.js_todo_app_adds_a_todo_api_calls.json");
    let saved: Value = serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
    assert_eq!(saved["testName"], json!("todo app / adds a todo"));
    assert_eq!(saved["apiCallsInThisTest"][1]["url"], json!("/todos"));
    assert_eq!(saved["apiCallsInThisTest"][1]["request"]["title"], json!("write code"));

    // --- Replay, backend gone ---
    drop(server);
    let offline = "http://127.0.0.1:9";
    let mut replaying = session(config("replay", offline, dir.path()));
    let mut test = replaying.begin_test(test_id()).await.unwrap();
    assert_eq!(test.mode(), Some(Mode::Playback));
    let replayed_bodies = add_todo(&mut test, offline).await.unwrap();
    assert_eq!(replayed_bodies, recorded_bodies);
    let report = replaying.finish_test(test, TestState::Passed).await.unwrap();
    assert_eq!(report.unused_calls, 0);
    assert_eq!(report.saved, None);

    // --- Inspect against a changed backend ---
    let changed =
        backend(json!([{"id": 1, "title": "write code", "completed": false, "owner": "me"}])).await;
    let base = changed.uri();
    let mut inspecting = session(config("inspect", &base, dir.path()));
    let mut test = inspecting.begin_test(test_id()).await.unwrap();
    assert_eq!(test.mode(), Some(Mode::Inspect));
    add_todo(&mut test, &base).await.unwrap();
    let report = inspecting.finish_test(test, TestState::Passed).await.unwrap();

    // local files keep no history, so nothing is saved
    assert_eq!(report.saved, None);
    assert_eq!(report.divergences.len(), 1);
    let divergence = &report.divergences[0];
    assert_eq!(divergence.url, "/todos");
    assert_eq!(
        divergence.kind,
        DivergenceKind::Response {
            diff: "array element 0 changed: object added key \"owner\"".into()
        }
    );
}

#[tokio::test]
async fn playback_only_runs_out_of_recorded_calls() {
    let dir = tempfile::tempdir().unwrap();
    let server = backend(json!([])).await;
    let base = server.uri();

    let mut recording = session(config("record", &base, dir.path()));
    let mut test = recording.begin_test(test_id()).await.unwrap();
    add_todo(&mut test, &base).await.unwrap();
    recording.finish_test(test, TestState::Passed).await.unwrap();

    let mut replaying = session(config("playback-only", &base, dir.path()));
    let mut test = replaying.begin_test(test_id()).await.unwrap();
    for _ in 0..2 {
        test.handle(LiveRequest::new("GET", format!("{base}/todos"), None), forward).await.unwrap();
    }
    let err = test
        .handle(LiveRequest::new("GET", format!("{base}/todos"), None), forward)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SequenceExhausted { index: 2 }));
    replaying.abort_test(test);
}
