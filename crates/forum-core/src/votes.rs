use chrono::Utc;
use forum_db::models::VoteRow;
use forum_db::{MessageCounter, format_timestamp};
use forum_types::models::{Message, VoteChoice, vote_key};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Change, Forum, ForumError, Result};

/// One step of the per-(message, user) vote state machine over
/// {none, up, down}. Choosing the current vote again clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub previous: Option<VoteChoice>,
    pub next: Option<VoteChoice>,
}

impl VoteTransition {
    pub fn compute(current: Option<VoteChoice>, choice: VoteChoice) -> Self {
        let next = if current == Some(choice) { None } else { Some(choice) };
        Self {
            previous: current,
            next,
        }
    }

    /// Counter movement as (upvotes, downvotes).
    pub fn deltas(&self) -> (i64, i64) {
        let mut up = 0;
        let mut down = 0;
        for (choice, sign) in [(self.previous, -1), (self.next, 1)] {
            match choice {
                Some(VoteChoice::Up) => up += sign,
                Some(VoteChoice::Down) => down += sign,
                None => {}
            }
        }
        (up, down)
    }

    /// Optimistic local update of a rendered message.
    pub fn apply(&self, message: &mut Message) {
        let (up, down) = self.deltas();
        message.upvotes += up;
        message.downvotes += down;
    }
}

impl Forum {
    /// Cast, switch or clear a vote and return the user's resulting vote.
    ///
    /// The vote document and the message counters are written separately;
    /// if the counter write fails the vote document stays and the counters
    /// drift from the vote records.
    pub fn vote(&self, message_id: Uuid, user: &str, choice: VoteChoice) -> Result<Option<VoteChoice>> {
        if user.trim().is_empty() {
            return Err(ForumError::invalid("missing voter identity"));
        }
        let mid = message_id.to_string();
        if self.db.get_message(&mid)?.is_none() {
            return Err(ForumError::NotFound("message"));
        }

        let key = vote_key(message_id, user);
        let current = self.db.get_vote(&key)?.and_then(|row| {
            row.choice
                .parse()
                .map_err(|e| warn!("Ignoring corrupt vote '{}': {}", key, e))
                .ok()
        });
        let transition = VoteTransition::compute(current, choice);
        let now = format_timestamp(Utc::now());

        match (transition.previous, transition.next) {
            (None, Some(next)) => {
                self.db.put_vote(&VoteRow {
                    id: key.clone(),
                    message_id: mid.clone(),
                    user_id: user.to_string(),
                    choice: next.as_str().to_string(),
                    created_at: now,
                })?;
                self.db.adjust_message_counter(&mid, counter_for(next), 1)?;
            }
            (Some(prev), None) => {
                self.db.delete_vote(&key)?;
                self.db.adjust_message_counter(&mid, counter_for(prev), -1)?;
            }
            (Some(_), Some(next)) => {
                self.db.set_vote_choice(&key, next.as_str(), &now)?;
                let (up, down) = transition.deltas();
                self.db.adjust_vote_counters(&mid, up, down)?;
            }
            (None, None) => {}
        }

        debug!("Vote on {} by {}: {:?} -> {:?}", message_id, user, transition.previous, transition.next);
        self.hub.publish(Change::Messages);
        Ok(transition.next)
    }

    /// The user's current vote. A failed read counts as no vote.
    pub fn get_vote(&self, message_id: Uuid, user: &str) -> Option<VoteChoice> {
        match self.db.get_vote(&vote_key(message_id, user)) {
            Ok(row) => row.and_then(|r| r.choice.parse().ok()),
            Err(e) => {
                warn!("Failed to read vote on {} by {}: {}", message_id, user, e);
                None
            }
        }
    }
}

fn counter_for(choice: VoteChoice) -> MessageCounter {
    match choice {
        VoteChoice::Up => MessageCounter::Upvotes,
        VoteChoice::Down => MessageCounter::Downvotes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_cover_every_state() {
        use VoteChoice::{Down, Up};

        let cast = VoteTransition::compute(None, Up);
        assert_eq!((cast.next, cast.deltas()), (Some(Up), (1, 0)));

        let clear = VoteTransition::compute(Some(Down), Down);
        assert_eq!((clear.next, clear.deltas()), (None, (0, -1)));

        let switch = VoteTransition::compute(Some(Up), Down);
        assert_eq!((switch.next, switch.deltas()), (Some(Down), (-1, 1)));
    }
}
