//! The STAR vote core: vote lifecycle management on top of the
//! [`star_voting`] tabulation engine.
//!
//! A vote is created Active, collects at most one ballot per voter
//! fingerprint, and becomes immutable once its deadline passes. The
//! [`scheduler`] sweep tallies due votes, copies them into the archive and
//! deletes the live rows; archives expire after a retention window.
//!
//! Storage stays behind the [`store::Store`] trait, and every time
//! comparison goes through an injected [`clock::Clock`], so the whole
//! lifecycle is deterministic under test.

pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod validation;

pub use crate::error::{VoteError, VoteResult};
pub use crate::model::{
    ArchivedBallot, ArchivedVote, Ballot, CreateVoteRequest, Vote, VoteId, VoteSnapshot,
};
pub use crate::service::VoteService;
