//! # Vote Ledger
//!
//! Keeps at most one vote per (user, post) and the post's aggregate score.
//! The transition rules live here as a pure function; persistence plugins run
//! it inside the same transaction that adjusts the score.

use crate::error::{AppError, Result};
use crate::models::{PostId, User, UserId, VoteTally};
use crate::traits::VoteRepo;
use std::sync::Arc;
use tracing::debug;

/// What casting `value` does to an existing (user, post) vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No vote existed: record it.
    Insert { value: i32 },
    /// Same value cast again: the vote is toggled off.
    Remove { previous: i32 },
    /// A different value replaces the existing one.
    Switch { previous: i32, value: i32 },
}

impl VoteTransition {
    /// Applies the toggle/switch rules. `value` must be nonzero.
    pub fn resolve(existing: Option<i32>, value: i32) -> Self {
        match existing {
            None => VoteTransition::Insert { value },
            Some(previous) if previous == value => VoteTransition::Remove { previous },
            Some(previous) => VoteTransition::Switch { previous, value },
        }
    }

    /// Amount to add to the post's score.
    pub fn score_delta(&self) -> i64 {
        match *self {
            VoteTransition::Insert { value } => i64::from(value),
            VoteTransition::Remove { previous } => -i64::from(previous),
            VoteTransition::Switch { previous, value } => i64::from(value) - i64::from(previous),
        }
    }

    /// The caller's vote once the transition is applied.
    pub fn effective_vote(&self) -> i32 {
        match *self {
            VoteTransition::Insert { value } | VoteTransition::Switch { value, .. } => value,
            VoteTransition::Remove { .. } => 0,
        }
    }
}

pub struct VoteLedger {
    votes: Arc<dyn VoteRepo>,
}

impl VoteLedger {
    pub fn new(votes: Arc<dyn VoteRepo>) -> Self {
        Self { votes }
    }

    pub async fn cast_vote(&self, voter: &User, post_id: PostId, value: i32) -> Result<VoteTally> {
        if value == 0 {
            return Err(AppError::invalid("vote value must be nonzero"));
        }
        let tally = self.votes.apply_vote(voter.id, post_id, value).await?;
        debug!(
            user_id = %voter.id,
            post_id = %post_id,
            value,
            score = tally.score,
            user_vote = tally.user_vote,
            "vote cast"
        );
        Ok(tally)
    }

    /// The user's current vote on the post, 0 when none exists.
    pub async fn user_vote_for(&self, user_id: UserId, post_id: PostId) -> Result<i32> {
        Ok(self
            .votes
            .find_vote(user_id, post_id)
            .await?
            .map(|vote| vote.value)
            .unwrap_or(0))
    }
}
