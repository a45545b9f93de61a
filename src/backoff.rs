//! Bounded exponential backoff around non-blocking acquires.
//!
//! For callers that want to wait for a lock without parking a thread in the
//! kernel indefinitely: each attempt uses `FailImmediately`, and only
//! `WouldBlock` is retried. Delays are cut short by Ctrl-C.

use crate::error::{LockError, LockResult};
use crate::interrupt;
use crate::region::{LockGrant, LockHandle, LockRequest, NativeLock, RegionLock, WaitMode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest `max_attempts` a configuration may ask for.
pub const MAX_ATTEMPTS_LIMIT: u32 = 100;

/// How often a backoff delay checks for an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(20);

/// Retry schedule: `initial`, doubling each attempt, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    /// Delay after the first failed attempt, in milliseconds.
    pub initial_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Total attempts including the first one.
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: 10,
            max_delay_ms: 500,
            max_attempts: 8,
        }
    }
}

impl Backoff {
    /// Delays slept between attempts, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let cap = self.max_delay_ms;
        let retries = self.max_attempts.saturating_sub(1) as usize;
        std::iter::successors(Some(self.initial_ms.min(cap)), move |prev| {
            Some(prev.saturating_mul(2).min(cap))
        })
        .take(retries)
        .map(Duration::from_millis)
    }
}

/// Acquire `request`, retrying on `WouldBlock` according to `backoff`.
///
/// The request's own wait mode is ignored. Returns the last `WouldBlock`
/// once all attempts are used, `Cancelled` if an interrupt arrives before
/// or during a delay, and any other error at once.
pub fn acquire_with_backoff<N: NativeLock>(
    locks: &RegionLock<N>,
    handle: &LockHandle<'_>,
    request: LockRequest,
    backoff: &Backoff,
) -> LockResult<LockGrant> {
    let request = LockRequest {
        wait: WaitMode::FailImmediately,
        ..request
    };
    let mut delays = backoff.delays();
    let mut attempt = 1;
    loop {
        match locks.acquire(handle, request) {
            Err(LockError::WouldBlock) => match delays.next() {
                Some(delay) => {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "lock busy, backing off");
                    if !interrupt::sleep_unless_interrupted(delay, INTERRUPT_POLL) {
                        tracing::info!(attempt, "interrupted while backing off");
                        return Err(LockError::Cancelled);
                    }
                    attempt += 1;
                }
                None => return Err(LockError::WouldBlock),
            },
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, RecordingLock, open_rw, scratch_lock_file};
    use serial_test::serial;
    use std::time::Instant;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn delays_double_and_cap() {
        let backoff = Backoff {
            initial_ms: 10,
            max_delay_ms: 50,
            max_attempts: 6,
        };
        assert_eq!(backoff.delays().collect::<Vec<_>>(), ms(&[10, 20, 40, 50, 50]));
    }

    #[test]
    fn single_attempt_has_no_delays() {
        let backoff = Backoff {
            max_attempts: 1,
            ..Backoff::default()
        };
        assert_eq!(backoff.delays().count(), 0);
    }

    #[test]
    #[serial]
    fn retries_until_lock_is_free() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::with_backend(RecordingLock::failing_at(0));
        let backoff = Backoff {
            initial_ms: 1,
            max_delay_ms: 1,
            max_attempts: 3,
        };

        let grant =
            acquire_with_backoff(&locks, &handle, LockRequest::exclusive(0, 10).blocking(), &backoff)
                .unwrap();
        assert_eq!(grant.length(), 10);
        assert_eq!(locks.backend().take_calls().len(), 2);
    }

    #[test]
    #[serial]
    fn gives_up_after_max_attempts() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::native();
        let backoff = Backoff {
            initial_ms: 1,
            max_delay_ms: 2,
            max_attempts: 3,
        };

        let _held = locks.acquire(&handle, LockRequest::shared(0, 10)).unwrap();
        // Exclusive over the handle's own grant is refused every time.
        let err = acquire_with_backoff(&locks, &handle, LockRequest::exclusive(0, 10), &backoff)
            .unwrap_err();
        assert!(err.is_would_block());
    }

    #[test]
    #[serial]
    fn interrupt_cancels_remaining_attempts() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::native();
        let backoff = Backoff {
            initial_ms: 500,
            max_delay_ms: 500,
            max_attempts: 40,
        };

        let held = locks.acquire(&handle, LockRequest::shared(0, 10)).unwrap();
        interrupt::set(true);
        let started = Instant::now();
        let result = acquire_with_backoff(&locks, &handle, LockRequest::exclusive(0, 10), &backoff);
        interrupt::set(false);

        assert!(matches!(result, Err(LockError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(2));
        locks.release(&handle, &held).unwrap();
    }

    #[test]
    #[serial]
    fn interrupt_during_delay_cancels() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::native();
        let backoff = Backoff {
            initial_ms: 10_000,
            max_delay_ms: 10_000,
            max_attempts: 3,
        };

        let held = locks.acquire(&handle, LockRequest::shared(0, 10)).unwrap();
        interrupt::set(false);
        let setter = std::thread::spawn(|| {
            std::thread::sleep(Duration::from_millis(50));
            interrupt::set(true);
        });
        let started = Instant::now();
        let result = acquire_with_backoff(&locks, &handle, LockRequest::exclusive(0, 10), &backoff);
        setter.join().unwrap();
        interrupt::set(false);

        assert!(matches!(result, Err(LockError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
        locks.release(&handle, &held).unwrap();
    }

    #[test]
    fn other_errors_are_not_retried() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::with_backend(RecordingLock::default());

        let err = acquire_with_backoff(
            &locks,
            &handle,
            LockRequest::exclusive(0, 0),
            &Backoff::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LockError::InvalidRequest(_)));
        assert_eq!(locks.backend().take_calls(), Vec::<Call>::new());
    }
}
