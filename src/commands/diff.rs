//! `magic-backend diff` command.

use std::path::Path;

use serde_json::Value;

use crate::diff::diff_json;
use crate::error::Result;

/// Execute the `diff` command: print the first structural difference
/// between two JSON documents, or `no difference`.
///
/// # Errors
///
/// Returns an error if either file cannot be read or is not JSON.
pub fn run(previous: &Path, current: &Path) -> Result<()> {
    let previous = read_json(previous)?;
    let current = read_json(current)?;
    match diff_json(Some(&previous), Some(&current)) {
        Some(explanation) => println!("{explanation}"),
        None => println!("no difference"),
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
