//! Per-handle record of outstanding grants.
//!
//! `fcntl` record locks are byte-granular: a handle holds at most one mode
//! per byte and relocking a range overwrites whatever was there. To keep
//! independent grants from weakening each other, every acquire and release
//! is turned into a list of segment transitions that move each byte to the
//! strongest mode still required by the handle's grants.

use super::{LockMode, Region};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Held {
    pub(super) id: u64,
    pub(super) mode: LockMode,
    pub(super) region: Region,
}

/// Change of the handle's effective mode over one segment.
///
/// `None` means unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Transition {
    pub(super) region: Region,
    pub(super) from: Option<LockMode>,
    pub(super) to: Option<LockMode>,
}

#[derive(Debug, Default)]
pub(super) struct Ledger {
    next_id: u64,
    grants: Vec<Held>,
}

impl Ledger {
    pub(super) fn held(&self) -> impl Iterator<Item = Held> + '_ {
        self.grants.iter().copied()
    }

    pub(super) fn len(&self) -> usize {
        self.grants.len()
    }

    /// An exclusive request may not overlap anything this handle holds.
    pub(super) fn conflicts_with_own(&self, mode: LockMode, region: &Region) -> bool {
        mode == LockMode::Exclusive && self.grants.iter().any(|g| g.region.overlaps(region))
    }

    pub(super) fn insert(&mut self, mode: LockMode, region: Region) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.grants.push(Held { id, mode, region });
        id
    }

    pub(super) fn remove(&mut self, id: u64) -> Option<Held> {
        let index = self.grants.iter().position(|g| g.id == id)?;
        Some(self.grants.remove(index))
    }

    /// Put back a grant whose release did not go through.
    pub(super) fn restore(&mut self, held: Held) {
        let index = self
            .grants
            .iter()
            .position(|g| g.id > held.id)
            .unwrap_or(self.grants.len());
        self.grants.insert(index, held);
    }

    /// Segments that change if a `mode` grant on `region` is added.
    pub(super) fn transitions_for_acquire(&self, mode: LockMode, region: Region) -> Vec<Transition> {
        let added = Held { id: 0, mode, region };
        let after: Vec<Held> = self.held().chain(std::iter::once(added)).collect();
        transitions(region, &self.grants, &after)
    }

    /// Segments that change now that `removed` is no longer in the ledger.
    pub(super) fn transitions_for_release(&self, removed: &Held) -> Vec<Transition> {
        let before: Vec<Held> = self.held().chain(std::iter::once(*removed)).collect();
        transitions(removed.region, &before, &self.grants)
    }
}

fn transitions(span: Region, before: &[Held], after: &[Held]) -> Vec<Transition> {
    let mut bounds = vec![span.offset, span.end()];
    for held in before.iter().chain(after) {
        for point in [held.region.offset, held.region.end()] {
            if point > span.offset && point < span.end() {
                bounds.push(point);
            }
        }
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out: Vec<Transition> = Vec::new();
    for pair in bounds.windows(2) {
        let segment = Region::new(pair[0], pair[1] - pair[0]);
        let from = strongest(before, &segment);
        let to = strongest(after, &segment);
        if from == to {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.region.end() == segment.offset && last.from == from && last.to == to => {
                last.region.length += segment.length;
            }
            _ => out.push(Transition {
                region: segment,
                from,
                to,
            }),
        }
    }
    out
}

fn strongest(grants: &[Held], segment: &Region) -> Option<LockMode> {
    let mut mode = None;
    for held in grants.iter().filter(|g| g.region.overlaps(segment)) {
        if held.mode == LockMode::Exclusive {
            return Some(LockMode::Exclusive);
        }
        mode = Some(LockMode::Shared);
    }
    mode
}
