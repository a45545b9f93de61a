//! Command implementations for regionlock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Commands write their user-facing output to a writer so
//! tests can capture it.

mod hold;
mod probe;
mod show;

use crate::cli::{Cli, Command};
use crate::context::RunContext;
use crate::error::Result;
use std::io::Write;

pub use hold::cmd_hold;
pub use probe::cmd_probe;
pub use show::cmd_show;

/// Dispatch a command to its implementation, printing to stdout.
pub fn dispatch(cli: Cli) -> Result<()> {
    let ctx = RunContext::resolve(&cli)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&ctx, cli.command, &mut out)
}

/// Run a command against an already resolved context.
pub fn run(ctx: &RunContext, command: Command, out: &mut dyn Write) -> Result<()> {
    tracing::debug!(lock_file = %ctx.lock_path.display(), identity = %ctx.identity, "running command");
    match command {
        Command::Hold(args) => cmd_hold(ctx, args, out),
        Command::Show(args) => cmd_show(ctx, args, out),
        Command::Probe(args) => cmd_probe(ctx, args, out),
    }
}
