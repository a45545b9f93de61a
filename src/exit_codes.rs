//! Exit code constants for the regionlock CLI.
//!
//! - 0: Success (including an observed holder and a graceful interrupt)
//! - 1: User error (bad args, bad config, invalid request)
//! - 3: I/O failure (record or lock-table error)
//! - 4: Lock unavailable (only `probe` reports this as a failure)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid configuration, or malformed request.
pub const USER_ERROR: i32 = 1;

/// I/O failure: record read/write error, lock-table error, cancelled wait.
pub const IO_FAILURE: i32 = 3;

/// Lock unavailable: a non-blocking request conflicted with another holder.
pub const LOCK_UNAVAILABLE: i32 = 4;
