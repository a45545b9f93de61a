//! Regionlock: advisory byte-range file locking from the command line.
//!
//! This is the main entry point for the `regionlock` CLI. It parses
//! arguments, sets up logging and Ctrl-C handling, dispatches to the
//! appropriate command handler, and handles errors with proper exit codes.

use regionlock::cli::Cli;
use regionlock::{commands, exit_codes, interrupt};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(err) = interrupt::install() {
        tracing::warn!(error = %err, "failed to install Ctrl-C handler");
    }

    match commands::dispatch(cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Log to stderr; RUST_LOG wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("regionlock={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
