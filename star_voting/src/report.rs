// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The lowest score a ballot may assign to an option.
pub const MIN_SCORE: u8 = 0;
/// The highest score a ballot may assign to an option.
pub const MAX_SCORE: u8 = 5;

/// The scores of a single ballot, aligned positionally with the election's
/// option list. A ballot shorter than the option list is acceptable: the
/// missing entries count as a score of zero.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotScores {
    pub scores: Vec<u8>,
}

impl BallotScores {
    pub fn new(scores: Vec<u8>) -> BallotScores {
        BallotScores { scores }
    }

    /// The score given to the option at `index`, with absent entries read as zero.
    pub fn score_at(&self, index: usize) -> u8 {
        self.scores.get(index).copied().unwrap_or(0)
    }
}

// ******** Output data structures *********

/// Aggregate statistics for a single option.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub name: String,
    /// Exact integer sum of this option's scores across all ballots.
    pub total_score: i64,
    /// `total_score / total_votes`, rounded to 2 decimals. Zero when no ballot was cast.
    pub average_score: f64,
    /// `frequency[s]` is the number of ballots that gave this option the score `s`.
    pub frequency: [u32; 6],
    /// The number of ballots counted for this option (equals the ballot count).
    pub total_votes: u32,
}

/// One pairwise matchup between two finalists, identified by their position
/// in the election's option list.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub finalists: (String, String),
    /// Head-to-head points: one per ballot that scored the corresponding
    /// finalist strictly higher than the other.
    pub points: (u32, u32),
    /// Ballots that scored both finalists equally.
    pub no_preference: u32,
}

/// The outcome of the automatic runoff stage.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunoffOutcome {
    pub winner: String,
    /// The options that entered the runoff, highest scoring first.
    pub finalists: Vec<String>,
    /// Every pairwise matchup between finalists (the head-to-head matrix).
    pub matchups: Vec<Matchup>,
}

/// The complete result of tabulating one election.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_ballots: u32,
    /// Per-option statistics, in the election's option order.
    pub options: Vec<OptionTally>,
    /// Absent when no winner is determinable (no options or no ballots).
    pub runoff: Option<RunoffOutcome>,
}

impl Statistics {
    pub fn winner(&self) -> Option<&str> {
        self.runoff.as_ref().map(|r| r.winner.as_str())
    }
}

/// Errors that prevent the tabulation from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    /// A ballot carries a score outside of [MIN_SCORE, MAX_SCORE].
    InvalidScore(u8),
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::InvalidScore(s) => {
                write!(f, "invalid score {} (must be {}-{})", s, MIN_SCORE, MAX_SCORE)
            }
        }
    }
}
