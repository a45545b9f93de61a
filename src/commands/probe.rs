//! `regionlock probe`: try one lock request on a byte range.

use crate::backoff;
use crate::cli::ProbeArgs;
use crate::context::RunContext;
use crate::error::{CliError, Result};
use crate::interrupt;
use crate::region::{LockHandle, LockMode, LockRequest, MAX_LOCK_END, RegionLock, WaitMode};
use std::io::Write;
use std::time::Duration;

/// Build the lock request described by the probe flags.
pub fn request_for(args: &ProbeArgs) -> Result<LockRequest> {
    if args.offset >= MAX_LOCK_END {
        return Err(CliError::UserError(format!(
            "offset {} is beyond the largest lockable offset",
            args.offset
        )));
    }
    let length = args.length.unwrap_or(MAX_LOCK_END - args.offset);
    let mode = if args.shared {
        LockMode::Shared
    } else {
        LockMode::Exclusive
    };
    let wait = if args.wait {
        WaitMode::Block
    } else {
        WaitMode::FailImmediately
    };
    Ok(LockRequest::new(mode, args.offset, length, wait))
}

/// Acquire the requested range, report it, hold it for `--hold-ms`, release.
///
/// A busy range is returned as `LockError::WouldBlock`, which the binary
/// turns into the lock-unavailable exit code.
pub fn cmd_probe(ctx: &RunContext, args: ProbeArgs, out: &mut dyn Write) -> Result<()> {
    let request = request_for(&args)?;
    let file = ctx.open_lock_file()?;
    let handle = LockHandle::new(&file);
    let locks = RegionLock::native();

    let grant = if args.retry {
        backoff::acquire_with_backoff(&locks, &handle, request, &ctx.config.backoff)?
    } else {
        locks.acquire(&handle, request)?
    };
    writeln!(out, "Granted {}", grant)?;

    if args.hold_ms > 0 {
        let completed = interrupt::sleep_unless_interrupted(
            Duration::from_millis(args.hold_ms),
            ctx.config.poll_interval(),
        );
        if !completed {
            writeln!(out, "Interrupted, releasing lock")?;
        }
    }

    locks.release(&handle, &grant)?;
    writeln!(out, "Released")?;
    Ok(())
}
