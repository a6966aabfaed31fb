//! `magic-backend show` command.

use crate::cassette::format::{TestApiRecordData, TestIdentity};
use crate::config::MagicBackendConfig;
use crate::error::Result;
use crate::store::load_baseline;

use super::StoreHandle;

/// Execute the `show` command: list the recorded calls a replay of `test`
/// would use.
///
/// # Errors
///
/// Returns an error if the configured store cannot be opened.
pub fn run(config: &MagicBackendConfig, test: &TestIdentity) -> Result<()> {
    let handle = StoreHandle::open(config)?;
    let baseline = handle.block_on(load_baseline(handle.store()?, test));
    match baseline {
        Some(record) => print!("{}", render(&record)),
        None => println!("No recorded API calls for {} \"{}\"", test.spec_name, test.test_name()),
    }
    Ok(())
}

fn render(record: &TestApiRecordData) -> String {
    let mut out = format!("Spec: {}\nTest: {}\n", record.spec_name, record.test_name);
    if let Some(state) = record.test_state {
        out.push_str(&format!("State: {state}\n"));
    }
    out.push_str(&format!(
        "Recorded by: {} {}\n",
        record.plugin_name, record.plugin_version
    ));
    out.push_str("\nAPI calls:\n");
    for (i, call) in record.api_calls_in_this_test.iter().enumerate() {
        out.push_str(&format!("  {}. {} {} ({}ms)\n", i + 1, call.method, call.url, call.duration));
    }
    if !record.divergences.is_empty() {
        out.push_str("\nDivergences:\n");
        for divergence in &record.divergences {
            out.push_str(&format!("  - {divergence}\n"));
        }
    }
    out
}
