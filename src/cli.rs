//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `magic-backend`.
#[derive(Debug, Parser)]
#[command(name = "magic-backend", version, about = "Inspect recorded API calls")]
pub struct Cli {
    /// Configuration file (`.json`, `.yaml` or `.yml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Explain how the second JSON document differs from the first.
    Diff {
        /// Earlier JSON document.
        previous: PathBuf,
        /// Later JSON document.
        current: PathBuf,
    },
    /// List the recorded API calls of a test.
    Show {
        /// Spec file the test lives in.
        #[arg(long)]
        spec: String,
        /// Suite and test titles, outermost first.
        #[arg(long = "title", required = true)]
        titles: Vec<String>,
    },
    /// Compare a test's current calls with its recorded history.
    Report {
        /// Spec file the test lives in.
        #[arg(long)]
        spec: String,
        /// Suite and test titles, outermost first.
        #[arg(long = "title", required = true)]
        titles: Vec<String>,
        /// JSON file with the current calls: a recording or a bare list.
        #[arg(long)]
        current: PathBuf,
    },
}
