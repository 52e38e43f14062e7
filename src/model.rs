use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use star_voting::{Matchup, Statistics};

pub type VoteId = Uuid;

/// Days an archived vote is retained before the cleanup purges it.
pub const ARCHIVE_RETENTION_DAYS: i64 = 30;

/// The mutable form of an election. Active rows only: once concluded, a
/// vote exists solely as an [`ArchivedVote`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: VoteId,
    pub title: String,
    pub description: String,
    /// Ordered: ballots reference options by position.
    pub options: Vec<String>,
    pub user_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub voting_ends_at: DateTime<Utc>,
    pub duration_hours: i32,
    pub duration_minutes: i32,
}

impl Vote {
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.voting_ends_at
    }
}

/// One voter's scores for one vote. At most one ballot exists per
/// (vote, fingerprint) pair; the store enforces the uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: Uuid,
    pub vote_id: VoteId,
    pub user_fingerprint: String,
    /// Aligned positionally with the vote's options, each in 0-5.
    pub scores: Vec<u8>,
    pub cast_at: DateTime<Utc>,
}

/// The immutable cold copy of a concluded vote. Owns its data outright:
/// the live rows are deleted in the same transaction that writes this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedVote {
    pub id: VoteId,
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub user_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub voting_ends_at: DateTime<Utc>,
    pub duration_hours: i32,
    pub duration_minutes: i32,
    pub archived_at: DateTime<Utc>,
    pub archive_expires_at: DateTime<Utc>,
    /// Computed once at conclusion and frozen.
    pub final_stats: Statistics,
    /// Absent when no winner was determinable (zero-ballot vote).
    pub winner: Option<String>,
    /// The runoff's head-to-head matrix.
    pub head_to_head: Vec<Matchup>,
}

impl ArchivedVote {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.archive_expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedBallot {
    pub id: Uuid,
    pub vote_id: VoteId,
    pub user_fingerprint: String,
    pub scores: Vec<u8>,
    pub cast_at: DateTime<Utc>,
}

impl From<Ballot> for ArchivedBallot {
    fn from(b: Ballot) -> ArchivedBallot {
        ArchivedBallot {
            id: b.id,
            vote_id: b.vote_id,
            user_fingerprint: b.user_fingerprint,
            scores: b.scores,
            cast_at: b.cast_at,
        }
    }
}

/// What a vote creation request carries before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVoteRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<String>,
    pub duration_hours: i32,
    pub duration_minutes: i32,
}

impl CreateVoteRequest {
    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
            + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// A vote in whichever stage of its life it currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteSnapshot {
    Active {
        vote: Vote,
        ballots: Vec<Ballot>,
    },
    Concluded {
        vote: ArchivedVote,
        ballots: Vec<ArchivedBallot>,
    },
}
