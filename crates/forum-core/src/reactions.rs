use std::sync::Arc;

use chrono::Utc;
use forum_db::format_timestamp;
use forum_db::models::ReactionRow;
use forum_types::models::{ReactionMap, reaction_key};
use tracing::debug;
use uuid::Uuid;

use crate::composer::is_allowed_emoji;
use crate::{Change, Forum, ForumError, Result, Subscription};

impl Forum {
    /// Add the (message, user, emoji) reaction if absent, remove it if
    /// present. Returns true when the reaction was added.
    pub fn toggle_reaction(&self, message_id: Uuid, user: &str, emoji: &str) -> Result<bool> {
        if user.trim().is_empty() {
            return Err(ForumError::invalid("missing reacting identity"));
        }
        if !is_allowed_emoji(emoji) {
            return Err(ForumError::invalid(format!("'{}' is not an available reaction", emoji)));
        }

        let added = self.db.toggle_reaction(
            &reaction_key(message_id, user, emoji),
            &message_id.to_string(),
            user,
            emoji,
            &format_timestamp(Utc::now()),
        )?;

        debug!("Reaction {} on {} by {}: added={}", emoji, message_id, user, added);
        self.hub.publish(Change::Reactions(message_id));
        Ok(added)
    }

    /// Emoji -> {count, users} recomputed from every reaction record of the
    /// message. Users are listed in reaction order.
    pub fn reaction_summary(&self, message_id: Uuid) -> Result<ReactionMap> {
        let rows = self.db.reactions_for_message(&message_id.to_string())?;
        Ok(summarize(&rows))
    }

    pub async fn subscribe_reactions(self: &Arc<Self>, message_id: Uuid) -> Result<Subscription<ReactionMap>> {
        self.live(
            "reactions",
            move |c| *c == Change::Reactions(message_id),
            move |f: &Forum| f.reaction_summary(message_id),
        )
        .await
    }
}

/// Group reaction records by emoji.
pub fn summarize(rows: &[ReactionRow]) -> ReactionMap {
    let mut map = ReactionMap::new();
    for r in rows {
        let entry = map.entry(r.emoji.clone()).or_default();
        entry.count += 1;
        entry.users.push(r.user_id.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ForumConfig;
    use crate::hub::within;
    use forum_db::Database;

    fn forum() -> Arc<Forum> {
        Arc::new(Forum::new(Database::open_in_memory().unwrap(), ForumConfig::default()))
    }

    #[test]
    fn users_can_hold_several_emojis_on_one_message() {
        let forum = forum();
        let m = Uuid::new_v4();

        assert!(forum.toggle_reaction(m, "0xa11ce", "🔥").unwrap());
        assert!(forum.toggle_reaction(m, "0xa11ce", "🚀").unwrap());
        assert!(forum.toggle_reaction(m, "0xb0b", "🔥").unwrap());

        let summary = forum.reaction_summary(m).unwrap();
        assert_eq!(summary["🔥"].count, 2);
        assert_eq!(summary["🔥"].users, vec!["0xa11ce", "0xb0b"]);
        assert_eq!(summary["🚀"].count, 1);
    }

    #[test]
    fn emoji_outside_the_palette_is_rejected() {
        let forum = forum();
        let err = forum.toggle_reaction(Uuid::new_v4(), "0xa11ce", "😴").unwrap_err();
        assert!(matches!(err, ForumError::Invalid(_)));
    }

    #[tokio::test]
    async fn subscription_only_follows_its_message() {
        let forum = forum();
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut sub = forum.subscribe_reactions(watched).await.unwrap();
        assert!(sub.current().is_empty());

        forum.toggle_reaction(other, "0xa11ce", "👍").unwrap();
        forum.toggle_reaction(watched, "0xa11ce", "👍").unwrap();

        let summary = within(sub.wait_for(|s| !s.is_empty())).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary["👍"].users, vec!["0xa11ce"]);
    }
}
