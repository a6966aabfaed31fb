//! Command dispatch and handlers.

pub mod diff;
pub mod report;
pub mod show;

use std::future::Future;
use std::path::Path;

use tokio::runtime::Runtime;

use crate::cassette::format::TestIdentity;
use crate::cli::{Cli, Command};
use crate::config::MagicBackendConfig;
use crate::context::ServiceContext;
use crate::error::Result;
use crate::mode::{ModeController, StorageMode};
use crate::store::RecordStore;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(cli: &Cli) -> std::result::Result<(), String> {
    let result = match &cli.command {
        Command::Diff { previous, current } => diff::run(previous, current),
        Command::Show { spec, titles } => {
            let config = load_config(cli.config.as_deref())?;
            show::run(&config, &TestIdentity::new(spec.as_str(), titles))
        }
        Command::Report { spec, titles, current } => {
            let config = load_config(cli.config.as_deref())?;
            report::run(&config, &TestIdentity::new(spec.as_str(), titles), current)
        }
    };
    result.map_err(|err| err.to_string())
}

/// Configuration from `path`, or defaults, with environment overrides applied.
fn load_config(path: Option<&Path>) -> std::result::Result<MagicBackendConfig, String> {
    let config = match path {
        Some(path) => MagicBackendConfig::load(path).map_err(|err| err.to_string())?,
        None => MagicBackendConfig::default(),
    };
    Ok(config.with_env())
}

/// The configured store plus a single-threaded runtime to drive it.
struct StoreHandle {
    ctx: ServiceContext,
    kind: StorageMode,
    runtime: Runtime,
}

impl StoreHandle {
    fn open(config: &MagicBackendConfig) -> Result<Self> {
        let kind = ModeController::resolve_storage(config.store.as_deref())?;
        let ctx = ServiceContext::live(config)?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self { ctx, kind, runtime })
    }

    fn store(&self) -> Result<&dyn RecordStore> {
        self.ctx.store(self.kind)
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
