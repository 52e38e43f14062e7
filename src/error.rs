use snafu::Snafu;

use crate::model::VoteId;
use crate::store::StoreError;

/// Everything that can go wrong inside one operation of the vote core.
///
/// Each variant is confined to a single transaction: a failed operation
/// leaves no partial writes behind.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum VoteError {
    /// Bad title, description, options, duration or scores. Nothing was
    /// written.
    #[snafu(display("invalid {field}: {reason}"))]
    Validation { field: &'static str, reason: String },

    /// The creator already holds the maximum number of active votes.
    #[snafu(display("{count} active votes held, the limit is {limit}"))]
    LimitExceeded { count: usize, limit: usize },

    /// This fingerprint already cast a ballot for this vote.
    #[snafu(display("a ballot for vote {vote_id} was already cast by this voter"))]
    DuplicateBallot { vote_id: VoteId },

    /// Mutation attempted on a vote that is past its deadline or archived.
    #[snafu(display("vote {vote_id} is closed and can no longer be changed"))]
    VoteClosed { vote_id: VoteId },

    #[snafu(display("no vote with id {vote_id}"))]
    NotFound { vote_id: VoteId },

    /// Store-level trouble (contention, lost connection). Recoverable: the
    /// scheduler retries on its next tick, callers may retry at will.
    #[snafu(display("transient store failure: {source}"))]
    Transient { source: StoreError },
}

impl From<StoreError> for VoteError {
    fn from(source: StoreError) -> VoteError {
        VoteError::Transient { source }
    }
}

pub type VoteResult<T> = Result<T, VoteError>;
