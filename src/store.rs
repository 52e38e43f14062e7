//! Abstract transactional storage for the vote core.
//!
//! Every backend implements [`Store`]; the rest of the crate depends only
//! on the trait. The bundled [`memory::MemoryStore`] covers single-node
//! deployments and tests; a database-backed store maps the same contract
//! onto its native transactions, unique indexes and row locks.

pub mod memory;

use chrono::{DateTime, Utc};
use snafu::Snafu;

use crate::model::{ArchivedBallot, ArchivedVote, Ballot, Vote, VoteId};

pub use memory::MemoryStore;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// An insert collided with an existing row.
    #[snafu(display("unique constraint violated: {constraint}"))]
    UniqueViolation { constraint: &'static str },

    /// A row expected by the transaction is gone.
    #[snafu(display("missing row for vote {vote_id}"))]
    RowMissing { vote_id: VoteId },

    /// The backend cannot serve the request right now.
    #[snafu(display("store unavailable: {message}"))]
    Unavailable { message: String },
}

/// The operations available inside one transaction.
///
/// Implementations must apply all effects atomically when the enclosing
/// [`Store::transaction`] closure returns `Ok`, and none of them when it
/// returns `Err`.
pub trait StoreTx {
    fn vote(&self, id: VoteId) -> Option<Vote>;
    fn insert_vote(&mut self, vote: Vote) -> Result<(), StoreError>;
    fn delete_vote(&mut self, id: VoteId) -> Result<(), StoreError>;
    /// Active votes created by this fingerprint (the limiter's count).
    fn count_active_votes_by(&self, fingerprint: &str) -> usize;
    /// Active votes whose deadline is at or before `now`, in deadline order.
    fn due_votes(&self, now: DateTime<Utc>) -> Vec<VoteId>;

    /// Enforces the unique constraint on (vote id, fingerprint).
    fn insert_ballot(&mut self, ballot: Ballot) -> Result<(), StoreError>;
    fn ballots_for(&self, id: VoteId) -> Vec<Ballot>;
    fn delete_ballots_for(&mut self, id: VoteId) -> Result<(), StoreError>;

    fn insert_archive(
        &mut self,
        vote: ArchivedVote,
        ballots: Vec<ArchivedBallot>,
    ) -> Result<(), StoreError>;
    fn archived_vote(&self, id: VoteId) -> Option<ArchivedVote>;
    fn archived_ballots_for(&self, id: VoteId) -> Vec<ArchivedBallot>;
    /// Removes an archive row and its ballots (children first).
    fn delete_archive(&mut self, id: VoteId) -> Result<(), StoreError>;
    /// Archived votes whose retention window has passed.
    fn expired_archives(&self, now: DateTime<Utc>) -> Vec<VoteId>;
}

pub trait Store {
    /// Runs `f` as one atomic unit: committed on `Ok`, rolled back on `Err`.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>;

    /// Non-blocking exclusive claim on one vote id. Returns false when
    /// another worker currently holds the claim; callers skip instead of
    /// waiting.
    fn try_acquire_exclusive(&self, id: VoteId) -> bool;

    fn release_exclusive(&self, id: VoteId);
}
