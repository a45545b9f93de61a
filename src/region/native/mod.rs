//! Native range-lock backends, one per platform, chosen at compile time.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use super::{LockMode, Region, WaitMode};
use crate::error::LockResult;
use std::fs::File;

#[cfg(unix)]
pub use unix::Fcntl as Platform;
#[cfg(windows)]
pub use windows::LockFileEx as Platform;

/// The capability a platform must offer: lock and unlock a byte range.
pub trait NativeLock {
    /// True when the platform keeps at most one mode per byte per holder, so
    /// relocking an overlapping range replaces the earlier lock instead of
    /// stacking on top of it.
    const COALESCES_RANGES: bool;

    fn lock(&self, file: &File, region: Region, mode: LockMode, wait: WaitMode) -> LockResult<()>;

    fn unlock(&self, file: &File, region: Region) -> LockResult<()>;
}
