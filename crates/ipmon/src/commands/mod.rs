//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod profile;
pub mod status;
pub mod util;

use ipmon_core::MonitorConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    monitor: &MonitorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(monitor, args, global).await,
        Command::Config(args) => config_cmd::handle(monitor, args, global).await,
        // Profile and Completions are handled before dispatch
        Command::Profile(_) | Command::Completions(_) => Ok(()),
    }
}
