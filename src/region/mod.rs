//! Advisory byte-range locking on open files.
//!
//! A [`LockHandle`] borrows an open [`File`] and tracks the grants taken
//! through it. [`RegionLock`] turns a [`LockRequest`] into a [`LockGrant`]
//! using the platform's native range-lock facility and releases grants
//! precisely.
//!
//! # Semantics
//!
//! - Two grants on overlapping ranges are compatible iff both are shared.
//! - `WaitMode::FailImmediately` never suspends: a conflict is reported as
//!   [`LockError::WouldBlock`].
//! - `WaitMode::Block` suspends the calling thread inside the locking
//!   syscall. There is no timeout and no FIFO fairness among waiters.
//! - On one handle, a shared request may nest inside the handle's own
//!   exclusive grant (this is how a holder downgrades a sub-range), while an
//!   exclusive request overlapping any of the handle's own grants is
//!   rejected with `WouldBlock` instead of deadlocking on itself.
//! - Closing the file releases every grant taken through it. That is
//!   platform behavior; release grants explicitly where correctness matters.
//!
//! # Platform notes
//!
//! On Linux locks belong to the open file description, so two handles in one
//! process exclude each other. Other Unix systems use process-wide POSIX
//! record locks: handles within one process never conflict there, so use
//! one process per holder. Network filesystems may implement advisory locks
//! weakly or not at all.

mod ledger;
mod native;


use crate::error::{LockError, LockResult};
use ledger::Ledger;
use std::fmt;
use std::fs::File;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

pub use native::{NativeLock, Platform};

/// Largest byte position a lock range may reach.
///
/// Every backend can express ranges up to `i64::MAX`; a whole-file lock
/// spans `[0, MAX_LOCK_END)` so it stays valid however far the file grows.
pub const MAX_LOCK_END: u64 = i64::MAX as u64;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Lock mode of a request or grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Readers' lock; any number may overlap.
    Shared,
    /// Writer's lock; overlaps nothing.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// What to do when the range is held incompatibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Suspend until the lock is granted.
    Block,
    /// Return `LockError::WouldBlock` at once.
    FailImmediately,
}

/// A half-open byte range `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub offset: u64,
    pub length: u64,
}

impl Region {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// One past the last byte of the region.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn range(&self) -> Range<u64> {
        self.offset..self.end()
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.end() == MAX_LOCK_END {
            write!(f, "[{}, EOF+)", self.offset)
        } else {
            write!(f, "[{}, {})", self.offset, self.end())
        }
    }
}

/// A single lock operation, built per call and consumed by `acquire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRequest {
    pub mode: LockMode,
    pub offset: u64,
    pub length: u64,
    pub wait: WaitMode,
}

impl LockRequest {
    pub fn new(mode: LockMode, offset: u64, length: u64, wait: WaitMode) -> Self {
        Self {
            mode,
            offset,
            length,
            wait,
        }
    }

    /// Exclusive, non-blocking request over `[offset, offset + length)`.
    pub fn exclusive(offset: u64, length: u64) -> Self {
        Self::new(LockMode::Exclusive, offset, length, WaitMode::FailImmediately)
    }

    /// Shared, non-blocking request over `[offset, offset + length)`.
    pub fn shared(offset: u64, length: u64) -> Self {
        Self::new(LockMode::Shared, offset, length, WaitMode::FailImmediately)
    }

    /// Request covering the whole file regardless of its current size.
    pub fn whole_file(mode: LockMode, wait: WaitMode) -> Self {
        Self::new(mode, 0, MAX_LOCK_END, wait)
    }

    /// The same request, waiting for the lock instead of failing.
    pub fn blocking(self) -> Self {
        Self {
            wait: WaitMode::Block,
            ..self
        }
    }

    pub fn region(&self) -> Region {
        Region::new(self.offset, self.length)
    }

    fn validate(&self) -> LockResult<()> {
        if self.length == 0 {
            return Err(LockError::InvalidRequest(
                "length must be greater than 0".to_string(),
            ));
        }
        match self.offset.checked_add(self.length) {
            Some(end) if end <= MAX_LOCK_END => Ok(()),
            _ => Err(LockError::InvalidRequest(format!(
                "range at offset {} with length {} extends past {}",
                self.offset, self.length, MAX_LOCK_END
            ))),
        }
    }
}

/// Proof that a range is locked; the token needed to release it.
///
/// A grant is only meaningful while the file it was taken on stays open.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a grant that is dropped without release stays locked until the file is closed"]
pub struct LockGrant {
    handle_id: u64,
    id: u64,
    mode: LockMode,
    region: Region,
}

impl LockGrant {
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn offset(&self) -> u64 {
        self.region.offset
    }

    pub fn length(&self) -> u64 {
        self.region.length
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn range(&self) -> Range<u64> {
        self.region.range()
    }
}

impl fmt::Display for LockGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lock on {}", self.mode, self.region)
    }
}

/// An open file as seen by the lock component.
///
/// The handle borrows the file; it never closes it. Use one handle per
/// logical holder: grants taken through the same handle never exclude each
/// other at the platform level.
///
/// A handle may be shared by reference between threads, but calls through
/// it are serialized: a `WaitMode::Block` acquire keeps the handle busy
/// until it is granted, so `release` and `outstanding` on the same handle
/// wait behind it.
pub struct LockHandle<'f> {
    file: &'f File,
    id: u64,
    ledger: Mutex<Ledger>,
}

impl<'f> LockHandle<'f> {
    pub fn new(file: &'f File) -> Self {
        Self {
            file,
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn file(&self) -> &'f File {
        self.file
    }

    /// Current size of the underlying file in bytes.
    pub fn size(&self) -> std::io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Grants currently held through this handle, in acquisition order.
    pub fn outstanding(&self) -> Vec<LockGrant> {
        self.ledger()
            .held()
            .map(|held| LockGrant {
                handle_id: self.id,
                id: held.id,
                mode: held.mode,
                region: held.region,
            })
            .collect()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl fmt::Debug for LockHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("id", &self.id)
            .field("outstanding", &self.ledger().len())
            .finish()
    }
}

/// Acquires and releases region locks through a native backend.
///
/// The lock component keeps no state of its own; the kernel lock table and
/// the per-handle grant ledger are the only state involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionLock<N = Platform> {
    backend: N,
}

impl RegionLock<Platform> {
    /// Region locking through this platform's native facility.
    pub fn native() -> Self {
        Self {
            backend: Platform::default(),
        }
    }
}

impl<N: NativeLock> RegionLock<N> {
    pub fn with_backend(backend: N) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &N {
        &self.backend
    }

    /// Lock `[offset, offset + length)` of the handle's file.
    ///
    /// Under `WaitMode::Block` other calls on the same handle wait until
    /// this one returns.
    ///
    /// # Errors
    ///
    /// * `WouldBlock` - conflict under `FailImmediately`, or an exclusive
    ///   request overlapping one of this handle's own grants
    /// * `InvalidRequest` - zero length or range past [`MAX_LOCK_END`]
    /// * `Cancelled` - a blocking wait was interrupted
    /// * `IoFailure` - any other platform error
    pub fn acquire(&self, handle: &LockHandle<'_>, request: LockRequest) -> LockResult<LockGrant> {
        request.validate()?;
        let region = request.region();
        let mut ledger = handle.ledger();

        if ledger.conflicts_with_own(request.mode, &region) {
            tracing::debug!(%region, mode = %request.mode, "request overlaps own grant");
            return Err(LockError::WouldBlock);
        }

        if N::COALESCES_RANGES {
            let transitions = ledger.transitions_for_acquire(request.mode, region);
            self.apply(handle.file, &transitions, request.wait)?;
        } else {
            self.backend
                .lock(handle.file, region, request.mode, request.wait)?;
        }

        let id = ledger.insert(request.mode, region);
        tracing::debug!(%region, mode = %request.mode, grant = id, "lock acquired");
        Ok(LockGrant {
            handle_id: handle.id,
            id,
            mode: request.mode,
            region,
        })
    }

    /// Release exactly the range described by `grant`.
    ///
    /// # Errors
    ///
    /// * `InvalidGrant` - the grant was already released or belongs to a
    ///   different handle
    /// * `IoFailure` - the platform refused the unlock; the grant stays held
    pub fn release(&self, handle: &LockHandle<'_>, grant: &LockGrant) -> LockResult<()> {
        if grant.handle_id != handle.id {
            return Err(LockError::InvalidGrant);
        }
        let mut ledger = handle.ledger();
        let Some(held) = ledger.remove(grant.id) else {
            return Err(LockError::InvalidGrant);
        };
        if held.mode != grant.mode || held.region != grant.region {
            ledger.restore(held);
            return Err(LockError::InvalidGrant);
        }

        let result = if N::COALESCES_RANGES {
            let transitions = ledger.transitions_for_release(&held);
            self.apply(handle.file, &transitions, WaitMode::FailImmediately)
        } else {
            self.backend.unlock(handle.file, held.region)
        };

        if let Err(err) = result {
            ledger.restore(held);
            return Err(err);
        }
        tracing::debug!(region = %held.region, mode = %held.mode, grant = held.id, "lock released");
        Ok(())
    }

    /// Apply segment transitions, undoing applied ones if a later one fails.
    fn apply(
        &self,
        file: &File,
        transitions: &[ledger::Transition],
        wait: WaitMode,
    ) -> LockResult<()> {
        for (done, transition) in transitions.iter().enumerate() {
            if let Err(err) = self.set(file, transition.region, transition.to, wait) {
                for applied in transitions[..done].iter().rev() {
                    if let Err(undo) =
                        self.set(file, applied.region, applied.from, WaitMode::FailImmediately)
                    {
                        tracing::warn!(region = %applied.region, error = %undo, "failed to roll back lock segment");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn set(
        &self,
        file: &File,
        region: Region,
        mode: Option<LockMode>,
        wait: WaitMode,
    ) -> LockResult<()> {
        match mode {
            Some(mode) => self.backend.lock(file, region, mode, wait),
            None => self.backend.unlock(file, region),
        }
    }
}
