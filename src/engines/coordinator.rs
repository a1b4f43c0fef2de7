use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

/// Outcome of a worker's attempt to become the finalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Won,
    Lost,
}

/// Per-worker bookkeeping so each worker is counted at most once.
#[derive(Debug, Default, Clone)]
pub struct WorkerTicket {
    collecting: bool,
    done: bool,
}

impl WorkerTicket {
    pub fn is_collector(&self) -> bool {
        self.collecting
    }
}

/// Collector latch plus a one-shot claim.
///
/// Every worker that contributed input is counted in; every one of those
/// counts itself out on its first finalize call. The single claimant waits
/// until the two counts meet, which requires all input calls to happen
/// before any finalize call.
#[derive(Debug, Default)]
pub struct FinalizeCoordinator {
    collecting: AtomicUsize,
    done_collecting: AtomicUsize,
    claimed: AtomicBool,
}

impl FinalizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_collector(&self, ticket: &mut WorkerTicket) {
        if !ticket.collecting {
            ticket.collecting = true;
            self.collecting.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn finish_collecting(&self, ticket: &mut WorkerTicket) {
        if ticket.collecting && !ticket.done {
            ticket.done = true;
            self.done_collecting.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn try_claim(&self) -> Claim {
        if self.claimed.swap(true, Ordering::AcqRel) {
            Claim::Lost
        } else {
            Claim::Won
        }
    }

    pub fn all_collected(&self) -> bool {
        self.done_collecting.load(Ordering::Acquire) >= self.collecting.load(Ordering::Acquire)
    }

    /// Yields the thread until every registered collector has finished.
    pub fn wait_for_collectors(&self) {
        let mut spins = 0u64;
        while !self.all_collected() {
            spins += 1;
            thread::yield_now();
        }
        if spins > 0 {
            log::debug!("finalizer yielded {} times waiting for collectors", spins);
        }
    }

    pub fn collectors(&self) -> usize {
        self.collecting.load(Ordering::Acquire)
    }
}
