//! The archival sweep. Externally ticked: a timer, cron job or test calls
//! the two entry points at whatever interval it likes, and both are
//! idempotent.
//!
//! Several scheduler instances may run concurrently against the same
//! store. Each due vote is claimed with a non-blocking exclusive lock;
//! a worker that loses the claim skips the vote instead of waiting, so
//! replicas never stall each other and each transition runs exactly once.

use log::{debug, error, info};

use crate::clock::Clock;
use crate::error::VoteResult;
use crate::lifecycle::{conclude_vote, Transition};
use crate::model::VoteId;
use crate::store::{Store, StoreError};

/// Counts from one lifecycle sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub concluded: u32,
    /// Due votes claimed by another worker at the time of this sweep.
    pub skipped: u32,
    pub failed: u32,
}

/// Counts from one archive cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub purged: u32,
    pub failed: u32,
}

// Releases the exclusive claim when the transition is done, error or not.
struct Claim<'a, S: Store> {
    store: &'a S,
    id: VoteId,
}

impl<S: Store> Drop for Claim<'_, S> {
    fn drop(&mut self) {
        self.store.release_exclusive(self.id);
    }
}

/// Finds every Active vote past its deadline and concludes each one in its
/// own transaction. A failure on one vote is logged and does not abort the
/// rest of the sweep.
pub fn run_lifecycle_sweep<S: Store, C: Clock>(store: &S, clock: &C) -> VoteResult<SweepReport> {
    let now = clock.now();
    let due: Vec<VoteId> =
        store.transaction(|tx| Ok::<_, StoreError>(tx.due_votes(now)))?;
    if !due.is_empty() {
        info!("lifecycle sweep: {} due votes", due.len());
    }

    let mut report = SweepReport::default();
    for id in due {
        if !store.try_acquire_exclusive(id) {
            debug!("lifecycle sweep: vote {} claimed elsewhere, skipping", id);
            report.skipped += 1;
            continue;
        }
        let _claim = Claim { store, id };
        match store.transaction(|tx| conclude_vote(tx, id, now)) {
            Ok(Transition::Concluded) => {
                info!("concluded vote {}", id);
                report.concluded += 1;
            }
            Ok(_) => {
                // Another worker finished it between the scan and the claim.
            }
            Err(e) => {
                error!("failed to conclude vote {}: {}", id, e);
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Deletes every archived vote whose retention window has passed, each in
/// its own transaction. Archives with a future expiry are retained.
pub fn run_archive_cleanup<S: Store, C: Clock>(store: &S, clock: &C) -> VoteResult<CleanupReport> {
    let now = clock.now();
    let expired: Vec<VoteId> =
        store.transaction(|tx| Ok::<_, StoreError>(tx.expired_archives(now)))?;

    let mut report = CleanupReport::default();
    for id in expired {
        let deleted: Result<(), StoreError> = store.transaction(|tx| tx.delete_archive(id));
        match deleted {
            Ok(()) => report.purged += 1,
            Err(e) => {
                error!("failed to purge archived vote {}: {}", id, e);
                report.failed += 1;
            }
        }
    }
    if report.purged > 0 {
        info!("archive cleanup: removed {} expired votes", report.purged);
    }
    Ok(report)
}
