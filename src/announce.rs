//! Claim and announce: take the lock file, say who you are, keep a read lock
//! on what you said.
//!
//! 1. Lock the whole file exclusively without waiting. If someone else holds
//!    any part of it, read their announcement instead (the observer path).
//! 2. Append a [`HolderRecord`] and flush it to disk.
//! 3. Take a shared lock over exactly the record's bytes, then drop the
//!    whole-file exclusive lock.
//! 4. Hold the shared lock for the task's duration; [`Claim::release`] ends
//!    the claim (closing the file also does).
//!
//! While a claim is held, any later whole-file exclusive attempt overlaps the
//! announced record and gets `WouldBlock`, while exclusive locks on ranges
//! that avoid the record still succeed.

use crate::error::{LockError, LockResult};
use crate::record::{self, HolderRecord};
use crate::region::{
    LockGrant, LockHandle, LockMode, LockRequest, NativeLock, Region, RegionLock, WaitMode,
};

/// Outcome of [`claim_and_announce`].
#[derive(Debug)]
pub enum ClaimOutcome {
    /// This caller is now the announced holder.
    Claimed(Claim),
    /// Someone else holds the file; this is their most recent announcement
    /// (`None` if the file has no complete record yet).
    Observed(Option<HolderRecord>),
}

/// An active claim: the announced record and the shared lock protecting it.
#[derive(Debug)]
pub struct Claim {
    record: HolderRecord,
    span: Region,
    grant: LockGrant,
}

impl Claim {
    pub fn record(&self) -> &HolderRecord {
        &self.record
    }

    /// Where the record sits in the file.
    pub fn span(&self) -> Region {
        self.span
    }

    pub fn grant(&self) -> &LockGrant {
        &self.grant
    }

    /// Give up the claim by releasing the shared lock on the record.
    pub fn release<N: NativeLock>(
        self,
        locks: &RegionLock<N>,
        handle: &LockHandle<'_>,
    ) -> LockResult<()> {
        locks.release(handle, &self.grant)?;
        tracing::info!(identity = %self.record.identity, span = %self.span, "claim released");
        Ok(())
    }
}

/// Run the claim-and-announce protocol for `identity` on the handle's file.
///
/// The handle's file must be open for reading and appending. Only
/// `WouldBlock` on the initial exclusive attempt leads to the observer path;
/// every other failure is returned.
///
/// If dropping the whole-file exclusive lock fails after the record was
/// written, the record lock is released and the error returned, but the
/// exclusive grant stays held on the handle. It is listed by
/// [`LockHandle::outstanding`] and can be released from there; closing the
/// file also drops it.
pub fn claim_and_announce<N: NativeLock>(
    locks: &RegionLock<N>,
    handle: &LockHandle<'_>,
    identity: &str,
) -> LockResult<ClaimOutcome> {
    record::validate_identity(identity)?;

    let whole = match locks.acquire(
        handle,
        LockRequest::whole_file(LockMode::Exclusive, WaitMode::FailImmediately),
    ) {
        Ok(grant) => grant,
        Err(LockError::WouldBlock) => {
            tracing::debug!("lock file is held elsewhere, reading last announcement");
            return Ok(ClaimOutcome::Observed(observe(handle)?));
        }
        Err(err) => return Err(err),
    };

    match announce(locks, handle, identity) {
        Ok((record, span, grant)) => {
            if let Err(err) = locks.release(handle, &whole) {
                if let Err(undo) = locks.release(handle, &grant) {
                    tracing::warn!(error = %undo, "failed to release record lock after failed downgrade");
                }
                return Err(err);
            }
            tracing::info!(identity = %record.identity, %span, "claim announced");
            Ok(ClaimOutcome::Claimed(Claim {
                record,
                span,
                grant,
            }))
        }
        Err(err) => {
            if let Err(release_err) = locks.release(handle, &whole) {
                tracing::warn!(error = %release_err, "failed to release exclusive lock after failed announce");
            }
            Err(err)
        }
    }
}

fn announce<N: NativeLock>(
    locks: &RegionLock<N>,
    handle: &LockHandle<'_>,
    identity: &str,
) -> LockResult<(HolderRecord, Region, LockGrant)> {
    let record = HolderRecord::now(identity)?;
    let span = record::append(handle.file(), &record)?;
    let grant = locks.acquire(handle, LockRequest::shared(span.offset, span.length))?;
    Ok((record, span, grant))
}

/// The observer path: read the last announced record without locking.
pub fn observe(handle: &LockHandle<'_>) -> LockResult<Option<HolderRecord>> {
    Ok(record::read_last(handle.file())?.map(|(_, record)| record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, RecordingLock, open_rw, scratch_lock_file};
    use crate::region::MAX_LOCK_END;

    #[test]
    fn claim_on_empty_file_announces_at_offset_zero() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::native();

        let claim = match claim_and_announce(&locks, &handle, "alice").unwrap() {
            ClaimOutcome::Claimed(claim) => claim,
            other => panic!("expected claim, got {:?}", other),
        };

        assert_eq!(claim.span().offset, 0);
        assert_eq!(claim.record().identity, "alice");
        assert_eq!(claim.grant().mode(), LockMode::Shared);
        assert_eq!(claim.grant().region(), claim.span());
        assert_eq!(handle.outstanding(), vec![claim.grant().clone()]);

        let bytes = record::read_span(&file, claim.span()).unwrap();
        assert_eq!(bytes, claim.record().to_line().as_bytes());

        claim.release(&locks, &handle).unwrap();
        assert!(handle.outstanding().is_empty());
    }

    #[test]
    fn second_claim_appends_after_previous_record() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::native();

        let ClaimOutcome::Claimed(first) = claim_and_announce(&locks, &handle, "alice").unwrap()
        else {
            panic!("first claim should succeed");
        };
        let first_span = first.span();
        first.release(&locks, &handle).unwrap();

        let ClaimOutcome::Claimed(second) = claim_and_announce(&locks, &handle, "bob").unwrap()
        else {
            panic!("second claim should succeed");
        };
        assert_eq!(second.span().offset, first_span.end());
        second.release(&locks, &handle).unwrap();

        let all = record::read_all(&file).unwrap();
        let names: Vec<&str> = all.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn invalid_identity_takes_no_lock() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::with_backend(RecordingLock::default());

        let err = claim_and_announce(&locks, &handle, "").unwrap_err();
        assert!(matches!(err, LockError::InvalidRequest(_)));
        assert!(locks.backend().take_calls().is_empty());
    }

    #[test]
    fn protocol_issues_exclusive_then_downgrade() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        let locks = RegionLock::with_backend(RecordingLock::default());

        let ClaimOutcome::Claimed(claim) = claim_and_announce(&locks, &handle, "alice").unwrap()
        else {
            panic!("claim should succeed");
        };
        let len = claim.span().length;

        assert_eq!(
            locks.backend().take_calls(),
            vec![
                Call::Lock(Region::new(0, MAX_LOCK_END), LockMode::Exclusive),
                Call::Lock(Region::new(0, len), LockMode::Shared),
                Call::Unlock(Region::new(len, MAX_LOCK_END - len)),
            ]
        );
    }

    #[test]
    fn would_block_on_claim_reads_last_record() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        record::append(&file, &HolderRecord::new("carol", "T0").unwrap()).unwrap();
        let handle = LockHandle::new(&file);
        let locks = RegionLock::with_backend(RecordingLock::failing_at(0));

        match claim_and_announce(&locks, &handle, "dave").unwrap() {
            ClaimOutcome::Observed(Some(record)) => assert_eq!(record.identity, "carol"),
            other => panic!("expected observed record, got {:?}", other),
        }
        assert_eq!(record::read_all(&file).unwrap().len(), 1);
    }

    #[test]
    fn failed_downgrade_does_not_leak_record_grant() {
        let (_dir, path) = scratch_lock_file();
        let file = open_rw(&path);
        let handle = LockHandle::new(&file);
        // Call 0 takes the whole file; call 1 is the downgrade of the record
        // range issued while releasing it.
        let locks = RegionLock::with_backend(RecordingLock::failing_at(1));

        let err = claim_and_announce(&locks, &handle, "erin").unwrap_err();
        assert!(err.is_would_block());

        let held = handle.outstanding();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].mode(), LockMode::Exclusive);
        assert_eq!(held[0].region().end(), MAX_LOCK_END);

        // The leftover exclusive grant can still be released by the caller.
        locks.backend().take_calls();
        locks.release(&handle, &held[0]).unwrap();
        assert!(handle.outstanding().is_empty());
        assert_eq!(
            locks.backend().take_calls(),
            vec![Call::Unlock(Region::new(0, MAX_LOCK_END))]
        );
    }

    #[cfg(any(target_os = "linux", windows))]
    mod cross_handle {
        use super::*;

        #[test]
        fn end_to_end_alice_scenario() {
            let (_dir, path) = scratch_lock_file();
            let file_a = open_rw(&path);
            let file_b = open_rw(&path);
            let a = LockHandle::new(&file_a);
            let b = LockHandle::new(&file_b);
            let locks = RegionLock::native();

            // Process A: whole-file exclusive on the empty file, announce,
            // downgrade to the record range.
            assert_eq!(a.size().unwrap(), 0);
            let whole = locks
                .acquire(&a, LockRequest::exclusive(0, MAX_LOCK_END))
                .unwrap();
            let alice = HolderRecord::new("alice", "T1").unwrap();
            let span = record::append(&file_a, &alice).unwrap();
            assert_eq!(span, Region::new(0, alice.to_line().len() as u64));
            let shared = locks
                .acquire(&a, LockRequest::shared(span.offset, span.length))
                .unwrap();
            locks.release(&a, &whole).unwrap();

            // Process B: exclusive over the current file size fails.
            let size = b.size().unwrap();
            assert_eq!(size, span.length);
            let err = locks.acquire(&b, LockRequest::exclusive(0, size)).unwrap_err();
            assert!(err.is_would_block());

            // B reads the trailing record instead.
            let bytes = record::read_span(&file_b, Region::new(size - span.length, span.length))
                .unwrap();
            assert_eq!(
                String::from_utf8(bytes).unwrap().trim_end(),
                "identity: alice, timestamp: T1"
            );
            assert_eq!(observe(&b).unwrap(), Some(alice));

            locks.release(&a, &shared).unwrap();
        }

        #[test]
        fn concurrent_claim_observes_the_holder() {
            let (_dir, path) = scratch_lock_file();
            let file_a = open_rw(&path);
            let file_b = open_rw(&path);
            let a = LockHandle::new(&file_a);
            let b = LockHandle::new(&file_b);
            let locks = RegionLock::native();

            let ClaimOutcome::Claimed(claim) = claim_and_announce(&locks, &a, "alice").unwrap()
            else {
                panic!("first claim should succeed");
            };

            match claim_and_announce(&locks, &b, "bob").unwrap() {
                ClaimOutcome::Observed(Some(record)) => assert_eq!(&record, claim.record()),
                other => panic!("expected to observe alice, got {:?}", other),
            }

            // Ranges clear of the record stay available to others.
            let beyond = claim.span().end();
            let grant = locks
                .acquire(&b, LockRequest::exclusive(beyond, 4096))
                .unwrap();
            locks.release(&b, &grant).unwrap();
            let err = locks
                .acquire(&b, LockRequest::exclusive(0, beyond))
                .unwrap_err();
            assert!(err.is_would_block());

            claim.release(&locks, &a).unwrap();

            match claim_and_announce(&locks, &b, "bob").unwrap() {
                ClaimOutcome::Claimed(next) => {
                    assert_eq!(next.span().offset, beyond);
                    next.release(&locks, &b).unwrap();
                }
                other => panic!("expected bob to claim, got {:?}", other),
            }
        }
    }
}
