//! CLI argument parsing for regionlock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Regionlock: advisory byte-range file locking demonstration.
///
/// Several processes share one lock file:
/// - The first to lock the whole file appends a holder record and keeps a
///   shared lock on just that record while it works
/// - Anyone arriving meanwhile cannot lock the file and prints the record
///   of whoever holds it
#[derive(Parser, Debug)]
#[command(name = "regionlock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Lock file to use (default: `lock_file` from the config, or lock.txt).
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Config file (default: regionlock.yaml in the current directory, if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Identity to announce instead of the current user name.
    #[arg(long, global = true, value_name = "NAME")]
    pub identity: Option<String>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for regionlock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Claim the lock file and hold it for a number of seconds.
    ///
    /// If another process holds it, print that holder's record instead.
    /// Ctrl-C releases the lock early and still exits successfully.
    Hold(HoldArgs),

    /// Print the most recent holder record without taking any lock.
    Show(ShowArgs),

    /// Try a single lock request on a byte range and report the result.
    ///
    /// Exits 0 if the lock was granted and 4 if it is held elsewhere.
    Probe(ProbeArgs),
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Seconds to hold the lock.
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub seconds: u64,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Print every record, oldest first.
    #[arg(long)]
    pub all: bool,

    /// Print records as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `probe` command.
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// First byte of the range.
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Length of the range (default: to the end of any possible file).
    #[arg(long)]
    pub length: Option<u64>,

    /// Request a shared lock instead of an exclusive one.
    #[arg(long)]
    pub shared: bool,

    /// Wait until the lock is granted.
    #[arg(long, conflicts_with = "retry")]
    pub wait: bool,

    /// Retry with the configured backoff instead of failing at once.
    #[arg(long)]
    pub retry: bool,

    /// Keep the lock this many milliseconds before releasing it.
    #[arg(long, default_value_t = 0, value_name = "MS")]
    pub hold_ms: u64,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
