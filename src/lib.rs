//! Regionlock: advisory byte-range locks on shared files.
//!
//! [`region::RegionLock`] takes shared or exclusive locks on byte ranges of a
//! file through the platform lock manager (OFD `fcntl` locks on Linux,
//! `fcntl` record locks on other Unix systems, `LockFileEx` on Windows).
//! [`announce`] builds the claim-and-announce protocol on top of it: the
//! holder of a lock file appends a record naming itself and keeps a shared
//! lock on that record, so anyone who cannot get the file can read who has
//! it.
//!
//! The `regionlock` binary wraps both in a small command line.

pub mod announce;
pub mod backoff;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod exit_codes;
pub mod identity;
pub mod interrupt;
pub mod record;
pub mod region;

#[cfg(test)]
mod test_support;

pub use announce::{Claim, ClaimOutcome, claim_and_announce};
pub use error::{LockError, LockResult};
pub use record::HolderRecord;
pub use region::{LockGrant, LockHandle, LockMode, LockRequest, Region, RegionLock, WaitMode};
