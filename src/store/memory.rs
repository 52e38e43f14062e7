//! In-process store for single-node deployments and tests.
//!
//! One mutex guards the shelves; a transaction stages its writes on a
//! clone and swaps it in on commit, so an `Err` from the closure leaves
//! the committed state untouched. The sweep's exclusive claims live in a
//! lock table keyed by vote id.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::model::{ArchivedBallot, ArchivedVote, Ballot, Vote, VoteId};
use crate::store::{Store, StoreError, StoreTx};

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    shelves: Mutex<Shelves>,
    claims: Mutex<HashSet<VoteId>>,
}

#[derive(Clone, Debug, Default)]
struct Shelves {
    votes: HashMap<VoteId, Vote>,
    ballots: HashMap<VoteId, Vec<Ballot>>,
    archived_votes: HashMap<VoteId, ArchivedVote>,
    archived_ballots: HashMap<VoteId, Vec<ArchivedBallot>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

struct MemoryTx<'a> {
    shelves: &'a mut Shelves,
}

impl Store for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E>,
    {
        let mut committed = self.inner.shelves.lock().map_err(|_| {
            StoreError::Unavailable {
                message: "shelf lock poisoned".to_string(),
            }
        })?;
        let mut staged = committed.clone();
        let out = f(&mut MemoryTx {
            shelves: &mut staged,
        })?;
        *committed = staged;
        Ok(out)
    }

    fn try_acquire_exclusive(&self, id: VoteId) -> bool {
        match self.inner.claims.lock() {
            Ok(mut claims) => claims.insert(id),
            Err(_) => false,
        }
    }

    fn release_exclusive(&self, id: VoteId) {
        if let Ok(mut claims) = self.inner.claims.lock() {
            claims.remove(&id);
        }
    }
}

impl StoreTx for MemoryTx<'_> {
    fn vote(&self, id: VoteId) -> Option<Vote> {
        self.shelves.votes.get(&id).cloned()
    }

    fn insert_vote(&mut self, vote: Vote) -> Result<(), StoreError> {
        if self.shelves.votes.contains_key(&vote.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "votes.id",
            });
        }
        self.shelves.ballots.insert(vote.id, Vec::new());
        self.shelves.votes.insert(vote.id, vote);
        Ok(())
    }

    fn delete_vote(&mut self, id: VoteId) -> Result<(), StoreError> {
        self.shelves
            .votes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing { vote_id: id })
    }

    fn count_active_votes_by(&self, fingerprint: &str) -> usize {
        self.shelves
            .votes
            .values()
            .filter(|v| v.user_fingerprint == fingerprint)
            .count()
    }

    fn due_votes(&self, now: DateTime<Utc>) -> Vec<VoteId> {
        let mut due: Vec<&Vote> = self
            .shelves
            .votes
            .values()
            .filter(|v| v.is_ended(now))
            .collect();
        due.sort_by_key(|v| (v.voting_ends_at, v.id));
        due.iter().map(|v| v.id).collect()
    }

    fn insert_ballot(&mut self, ballot: Ballot) -> Result<(), StoreError> {
        let shelf = self
            .shelves
            .ballots
            .get_mut(&ballot.vote_id)
            .ok_or(StoreError::RowMissing {
                vote_id: ballot.vote_id,
            })?;
        if shelf
            .iter()
            .any(|b| b.user_fingerprint == ballot.user_fingerprint)
        {
            return Err(StoreError::UniqueViolation {
                constraint: "ballots(vote_id, user_fingerprint)",
            });
        }
        shelf.push(ballot);
        Ok(())
    }

    fn ballots_for(&self, id: VoteId) -> Vec<Ballot> {
        self.shelves.ballots.get(&id).cloned().unwrap_or_default()
    }

    fn delete_ballots_for(&mut self, id: VoteId) -> Result<(), StoreError> {
        self.shelves.ballots.remove(&id);
        Ok(())
    }

    fn insert_archive(
        &mut self,
        vote: ArchivedVote,
        ballots: Vec<ArchivedBallot>,
    ) -> Result<(), StoreError> {
        if self.shelves.archived_votes.contains_key(&vote.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "archived_votes.id",
            });
        }
        self.shelves.archived_ballots.insert(vote.id, ballots);
        self.shelves.archived_votes.insert(vote.id, vote);
        Ok(())
    }

    fn archived_vote(&self, id: VoteId) -> Option<ArchivedVote> {
        self.shelves.archived_votes.get(&id).cloned()
    }

    fn archived_ballots_for(&self, id: VoteId) -> Vec<ArchivedBallot> {
        self.shelves
            .archived_ballots
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    fn delete_archive(&mut self, id: VoteId) -> Result<(), StoreError> {
        self.shelves.archived_ballots.remove(&id);
        self.shelves
            .archived_votes
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RowMissing { vote_id: id })
    }

    fn expired_archives(&self, now: DateTime<Utc>) -> Vec<VoteId> {
        let mut expired: Vec<&ArchivedVote> = self
            .shelves
            .archived_votes
            .values()
            .filter(|v| v.is_expired(now))
            .collect();
        expired.sort_by_key(|v| (v.archive_expires_at, v.id));
        expired.iter().map(|v| v.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn sample_vote(id: VoteId, fingerprint: &str) -> Vote {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Vote {
            id,
            title: "Team lunch".to_string(),
            description: String::new(),
            options: vec!["Ramen".to_string(), "Tacos".to_string()],
            user_fingerprint: fingerprint.to_string(),
            created_at: created,
            voting_ends_at: created + chrono::Duration::hours(2),
            duration_hours: 2,
            duration_minutes: 0,
        }
    }

    fn sample_ballot(vote_id: VoteId, fingerprint: &str) -> Ballot {
        Ballot {
            id: Uuid::new_v4(),
            vote_id,
            user_fingerprint: fingerprint.to_string(),
            scores: vec![5, 2],
            cast_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn rolls_back_on_error() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let res: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert_vote(sample_vote(id, "u1"))?;
            Err(StoreError::Unavailable {
                message: "boom".to_string(),
            })
        });
        assert!(res.is_err());
        let found: Result<Option<Vote>, StoreError> = store.transaction(|tx| Ok(tx.vote(id)));
        assert_eq!(found.unwrap(), None);
    }

    #[test]
    fn ballot_uniqueness_is_per_vote_and_fingerprint() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let res: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert_vote(sample_vote(id, "creator"))?;
            tx.insert_ballot(sample_ballot(id, "v1"))?;
            tx.insert_ballot(sample_ballot(id, "v2"))?;
            Ok(())
        });
        res.unwrap();
        let dup: Result<(), StoreError> =
            store.transaction(|tx| tx.insert_ballot(sample_ballot(id, "v1")));
        assert!(matches!(dup, Err(StoreError::UniqueViolation { .. })));
    }

    #[test]
    fn exclusive_claims_do_not_block() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        assert!(store.try_acquire_exclusive(id));
        assert!(!store.try_acquire_exclusive(id));
        store.release_exclusive(id);
        assert!(store.try_acquire_exclusive(id));
    }

    #[test]
    fn due_votes_come_back_in_deadline_order() {
        let store = MemoryStore::new();
        let early = Uuid::new_v4();
        let late = Uuid::new_v4();
        let res: Result<(), StoreError> = store.transaction(|tx| {
            let mut a = sample_vote(late, "u1");
            a.voting_ends_at = a.created_at + chrono::Duration::hours(4);
            let b = sample_vote(early, "u2");
            tx.insert_vote(a)?;
            tx.insert_vote(b)?;
            Ok(())
        });
        res.unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let due: Result<Vec<VoteId>, StoreError> = store.transaction(|tx| Ok(tx.due_votes(now)));
        assert_eq!(due.unwrap(), vec![early, late]);
    }
}
