//! The operations exposed to the outer layers (HTTP handlers, CLIs,
//! tests): vote creation, ballot casting and on-demand tallies. Each call
//! is one store transaction; a failure leaves nothing behind.

use log::{debug, info};
use snafu::ensure;
use uuid::Uuid;

use star_voting::{run_star_tally, BallotScores, Statistics};

use crate::clock::Clock;
use crate::error::{
    DuplicateBallotSnafu, LimitExceededSnafu, NotFoundSnafu, ValidationSnafu, VoteClosedSnafu,
    VoteResult,
};
use crate::model::{Ballot, CreateVoteRequest, Vote, VoteId, VoteSnapshot};
use crate::store::{Store, StoreError};
use crate::validation;

pub struct VoteService<S, C> {
    store: S,
    clock: C,
    active_limit: usize,
}

impl<S: Store, C: Clock> VoteService<S, C> {
    pub fn new(store: S, clock: C) -> VoteService<S, C> {
        VoteService {
            store,
            clock,
            active_limit: validation::MAX_ACTIVE_VOTES_PER_USER,
        }
    }

    /// Lowers (or raises) the per-fingerprint active vote cap.
    pub fn with_active_limit(mut self, limit: usize) -> VoteService<S, C> {
        self.active_limit = limit;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Validates and inserts a new Active vote. The limiter count and the
    /// insert run in the same transaction, so concurrent creations by one
    /// fingerprint cannot overshoot the cap.
    pub fn create_vote(&self, request: &CreateVoteRequest, fingerprint: &str) -> VoteResult<Vote> {
        validation::validate_title(&request.title)?;
        validation::validate_description(&request.description)?;
        validation::validate_options(&request.options)?;
        validation::validate_duration(request.duration_hours, request.duration_minutes)?;

        let now = self.clock.now();
        let vote = Vote {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            description: request.description.clone(),
            options: request.options.clone(),
            user_fingerprint: fingerprint.to_string(),
            created_at: now,
            voting_ends_at: now + request.duration(),
            duration_hours: request.duration_hours,
            duration_minutes: request.duration_minutes,
        };

        let limit = self.active_limit;
        let created = self.store.transaction(|tx| {
            let held = tx.count_active_votes_by(&vote.user_fingerprint);
            ensure!(held < limit, LimitExceededSnafu { count: held, limit });
            tx.insert_vote(vote.clone())?;
            Ok::<_, crate::error::VoteError>(vote.clone())
        })?;
        info!("created vote {} ending {}", created.id, created.voting_ends_at);
        Ok(created)
    }

    /// Validates and inserts one ballot. Rejects a second ballot from the
    /// same fingerprint (`DuplicateBallot`) and any cast past the deadline
    /// (`VoteClosed`), even before the sweep has archived the vote.
    pub fn cast_ballot(
        &self,
        vote_id: VoteId,
        fingerprint: &str,
        scores: Vec<u8>,
    ) -> VoteResult<Ballot> {
        let now = self.clock.now();
        let ballot = self.store.transaction(|tx| {
            let vote = match tx.vote(vote_id) {
                Some(vote) => vote,
                None if tx.archived_vote(vote_id).is_some() => {
                    return VoteClosedSnafu { vote_id }.fail();
                }
                None => return NotFoundSnafu { vote_id }.fail(),
            };
            ensure!(!vote.is_ended(now), VoteClosedSnafu { vote_id });
            validation::validate_scores(&scores, vote.options.len())?;

            let ballot = Ballot {
                id: Uuid::new_v4(),
                vote_id,
                user_fingerprint: fingerprint.to_string(),
                scores: scores.clone(),
                cast_at: now,
            };
            tx.insert_ballot(ballot.clone()).map_err(|e| match e {
                StoreError::UniqueViolation { .. } => {
                    DuplicateBallotSnafu { vote_id }.build()
                }
                other => other.into(),
            })?;
            Ok(ballot)
        })?;
        debug!("ballot {} cast for vote {}", ballot.id, vote_id);
        Ok(ballot)
    }

    /// Tallies an Active vote's current ballots on demand. For a concluded
    /// vote this returns the frozen statistics from the archive.
    pub fn compute_live_stats(&self, vote_id: VoteId) -> VoteResult<Statistics> {
        self.store.transaction(|tx| {
            if let Some(vote) = tx.vote(vote_id) {
                let ballots = tx.ballots_for(vote_id);
                let scores: Vec<BallotScores> = ballots
                    .iter()
                    .map(|b| BallotScores::new(b.scores.clone()))
                    .collect();
                return run_star_tally(&vote.options, &scores).map_err(|e| {
                    ValidationSnafu {
                        field: "scores",
                        reason: e.to_string(),
                    }
                    .build()
                });
            }
            match tx.archived_vote(vote_id) {
                Some(archived) => Ok(archived.final_stats),
                None => NotFoundSnafu { vote_id }.fail(),
            }
        })
    }

    /// Looks a vote up in whichever stage it is: live rows first, then the
    /// archive.
    pub fn find_vote(&self, vote_id: VoteId) -> VoteResult<VoteSnapshot> {
        self.store.transaction(|tx| {
            if let Some(vote) = tx.vote(vote_id) {
                return Ok(VoteSnapshot::Active {
                    ballots: tx.ballots_for(vote_id),
                    vote,
                });
            }
            match tx.archived_vote(vote_id) {
                Some(vote) => Ok(VoteSnapshot::Concluded {
                    ballots: tx.archived_ballots_for(vote_id),
                    vote,
                }),
                None => NotFoundSnafu { vote_id }.fail(),
            }
        })
    }

    /// See [`crate::scheduler::run_lifecycle_sweep`].
    pub fn run_lifecycle_sweep(&self) -> VoteResult<crate::scheduler::SweepReport> {
        crate::scheduler::run_lifecycle_sweep(&self.store, &self.clock)
    }

    /// See [`crate::scheduler::run_archive_cleanup`].
    pub fn run_archive_cleanup(&self) -> VoteResult<crate::scheduler::CleanupReport> {
        crate::scheduler::run_archive_cleanup(&self.store, &self.clock)
    }
}
