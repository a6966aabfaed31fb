//! `magic-backend report` command.

use std::path::Path;

use serde::Deserialize;

use crate::cassette::format::{ApiCallRecord, TestApiRecordData, TestIdentity};
use crate::config::MagicBackendConfig;
use crate::error::Result;
use crate::report;
use crate::store::load_history;

use super::StoreHandle;

/// Current calls, either as a full recording or a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum CurrentCalls {
    Recording(TestApiRecordData),
    Calls(Vec<ApiCallRecord>),
}

/// Execute the `report` command: compare the calls in `current` with every
/// recorded attempt of `test`.
///
/// # Errors
///
/// Returns an error if `current` cannot be read or parsed, or the store
/// cannot be opened.
pub fn run(config: &MagicBackendConfig, test: &TestIdentity, current: &Path) -> Result<()> {
    let content = std::fs::read_to_string(current)?;
    let calls = match serde_json::from_str(&content)? {
        CurrentCalls::Recording(record) => record.api_calls_in_this_test,
        CurrentCalls::Calls(calls) => calls,
    };

    let handle = StoreHandle::open(config)?;
    let history = handle.block_on(load_history(handle.store()?, test));
    let report = report::build(&history, &calls);
    println!("{}", report.text);
    if report.has_failures {
        println!("\nSome earlier attempts of this test failed.");
    }
    Ok(())
}
