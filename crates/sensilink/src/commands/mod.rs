//! Command dispatch: bridges CLI args -> core operations -> sinks and output.

pub mod config_cmd;
pub mod discover;
pub mod ingest;
pub mod poll;
pub mod records;
pub mod relay;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service- or store-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Poll(args) => poll::handle(args, global).await,
        Command::Discover => discover::handle(global).await,
        Command::Ingest(args) => ingest::handle(args, global).await,
        Command::Relay(args) => relay::handle(args, global).await,
        Command::Records(args) => records::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
