//! `regionlock hold`: claim the lock file or report who holds it.

use crate::announce::{self, ClaimOutcome};
use crate::cli::HoldArgs;
use crate::config::ObserveMode;
use crate::context::RunContext;
use crate::error::Result;
use crate::interrupt;
use crate::record::{self, HolderRecord};
use crate::region::{LockHandle, RegionLock};
use std::fs::File;
use std::io::Write;
use std::time::Duration;

/// Run the claim-and-announce protocol and hold the claim for `seconds`.
///
/// `Testing file locking...` and `Test complete` bracket the run even when
/// it fails.
pub fn cmd_hold(ctx: &RunContext, args: HoldArgs, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "Testing file locking...")?;
    let result = hold(ctx, &args, out);
    writeln!(out, "Test complete")?;
    result
}

fn hold(ctx: &RunContext, args: &HoldArgs, out: &mut dyn Write) -> Result<()> {
    let file = ctx.open_lock_file()?;
    let handle = LockHandle::new(&file);
    let locks = RegionLock::native();

    match announce::claim_and_announce(&locks, &handle, &ctx.identity)? {
        ClaimOutcome::Claimed(claim) => {
            writeln!(
                out,
                "Lock acquired, holding for {}s\n\t{}",
                args.seconds,
                claim.record()
            )?;
            let completed = interrupt::sleep_unless_interrupted(
                Duration::from_secs(args.seconds),
                ctx.config.poll_interval(),
            );
            if !completed {
                tracing::info!("interrupted, releasing early");
                writeln!(out, "Interrupted, releasing lock")?;
            }
            claim.release(&locks, &handle)?;
        }
        ClaimOutcome::Observed(last) => {
            writeln!(out, "File locked!")?;
            match ctx.config.observe {
                ObserveMode::Last => print_record(out, last.as_ref())?,
                ObserveMode::History => print_history(out, &file)?,
            }
        }
    }
    Ok(())
}

fn print_record(out: &mut dyn Write, record: Option<&HolderRecord>) -> Result<()> {
    match record {
        Some(record) => writeln!(out, "\t{}", record)?,
        None => writeln!(out, "\t(no holder record yet)")?,
    }
    Ok(())
}

fn print_history(out: &mut dyn Write, file: &File) -> Result<()> {
    let records = record::read_all(file)?;
    if records.is_empty() {
        return print_record(out, None);
    }
    for record in &records {
        writeln!(out, "\t{}", record)?;
    }
    Ok(())
}
