//! Record, replay and inspect the API calls made by end-to-end tests.
//!
//! A host test runner intercepts network calls and hands them to a
//! [`cassette::session::RecordingSession`]. Depending on the resolved
//! [`mode::Mode`], calls are captured and saved, answered from an earlier
//! recording, or let through and compared with it. Recordings live in a
//! [`store::RecordStore`], either local JSON files or a remote service.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod intercept;
pub mod logging;
pub mod mode;
pub mod ports;
pub mod report;
pub mod store;

pub use error::{Error, Result};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> std::result::Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli)
}
