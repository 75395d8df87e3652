//! CLI entry point for avfetch.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app;
mod cli;

use cli::Args;

/// Process outcome mapped to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse before tracing so --help works without logs.
    let args = Args::parse();

    app::terminal::init_tracing(app::terminal::default_log_level(args.quiet, args.verbose));
    debug!(?args, "CLI arguments parsed");

    let exit = app::run(args).await?;
    Ok(exit.into())
}
