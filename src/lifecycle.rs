//! The single state transition of a vote: Active to Concluded.
//!
//! Everything happens inside the caller's transaction, so a vote is never
//! observable half-way: tallied but not archived, or archived but not
//! deleted.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use star_voting::{run_star_tally, BallotScores};

use crate::error::{NotFoundSnafu, ValidationSnafu, VoteResult};
use crate::model::{ArchivedBallot, ArchivedVote, VoteId, ARCHIVE_RETENTION_DAYS};
use crate::store::StoreTx;

/// What a conclusion attempt found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The vote was tallied, archived and its live rows deleted.
    Concluded,
    /// The vote already lives in the archive; nothing to do.
    AlreadyConcluded,
    /// The deadline has not passed yet; nothing to do.
    NotDue,
}

/// Concludes one vote if its deadline has passed: computes the final
/// statistics, writes the immutable archive copy (vote, winner,
/// head-to-head matrix and every ballot) and deletes the active rows,
/// children first.
///
/// Re-running on an already concluded vote is a no-op, which makes the
/// sweep idempotent. A vote without ballots archives with no winner.
pub fn conclude_vote(
    tx: &mut dyn StoreTx,
    vote_id: VoteId,
    now: DateTime<Utc>,
) -> VoteResult<Transition> {
    let vote = match tx.vote(vote_id) {
        Some(vote) => vote,
        None if tx.archived_vote(vote_id).is_some() => return Ok(Transition::AlreadyConcluded),
        None => return NotFoundSnafu { vote_id }.fail(),
    };
    if !vote.is_ended(now) {
        return Ok(Transition::NotDue);
    }

    let ballots = tx.ballots_for(vote_id);
    let scores: Vec<BallotScores> = ballots
        .iter()
        .map(|b| BallotScores::new(b.scores.clone()))
        .collect();
    let final_stats = run_star_tally(&vote.options, &scores).map_err(|e| {
        ValidationSnafu {
            field: "scores",
            reason: e.to_string(),
        }
        .build()
    })?;
    debug!(
        "conclude_vote: {} tallied, {} ballots, winner {:?}",
        vote_id,
        ballots.len(),
        final_stats.winner()
    );

    let archived = ArchivedVote {
        id: vote.id,
        title: vote.title,
        description: vote.description,
        options: vote.options,
        user_fingerprint: vote.user_fingerprint,
        created_at: vote.created_at,
        voting_ends_at: vote.voting_ends_at,
        duration_hours: vote.duration_hours,
        duration_minutes: vote.duration_minutes,
        archived_at: now,
        archive_expires_at: now + Duration::days(ARCHIVE_RETENTION_DAYS),
        winner: final_stats.winner().map(|w| w.to_string()),
        head_to_head: final_stats
            .runoff
            .as_ref()
            .map(|r| r.matchups.clone())
            .unwrap_or_default(),
        final_stats,
    };
    let copies: Vec<ArchivedBallot> = ballots.into_iter().map(ArchivedBallot::from).collect();

    tx.insert_archive(archived, copies)?;
    tx.delete_ballots_for(vote_id)?;
    tx.delete_vote(vote_id)?;
    Ok(Transition::Concluded)
}
