use std::sync::Arc;

use chrono::Utc;
use forum_db::format_timestamp;
use forum_db::models::MessageRow;
use forum_types::models::{Message, User};
use tracing::{error, info};
use uuid::Uuid;

use crate::composer::filter_emojis;
use crate::{Change, Forum, ForumError, Result, Subscription, best_effort, convert};

impl Forum {
    /// Post a message and return its id.
    ///
    /// The text is trimmed and screened against the emoji palette, then must
    /// be non-empty and within the configured length. Linking the reply into
    /// the parent and bumping the author's message count are best-effort and
    /// never fail the post.
    pub fn create_message(&self, author: &User, text: &str, reply_to: Option<Uuid>) -> Result<Uuid> {
        if author.address.trim().is_empty() {
            return Err(ForumError::invalid("missing author identity"));
        }

        let text = filter_emojis(text.trim());
        let text = text.trim();
        if text.is_empty() {
            return Err(ForumError::invalid("message text is empty"));
        }
        let chars = text.chars().count();
        if chars > self.config.max_message_chars {
            return Err(ForumError::invalid(format!(
                "message is {} characters, limit is {}",
                chars, self.config.max_message_chars
            )));
        }

        let id = Uuid::new_v4();
        self.db
            .insert_message(&MessageRow {
                id: id.to_string(),
                author_id: Some(author.address.clone()),
                username: Some(author.username.clone()),
                is_orb_verified: author.is_orb_verified,
                profile_picture_url: author.profile_picture_url.clone(),
                text: Some(text.to_string()),
                created_at: format_timestamp(Utc::now()),
                upvotes: 0,
                downvotes: 0,
                report_count: 0,
                reply_to: reply_to.map(|p| p.to_string()),
                replies: "[]".into(),
                is_edited: false,
                edited_at: None,
            })
            .map_err(|e| {
                error!("Failed to store message from {}: {}", author.address, e);
                e
            })?;

        if let Some(parent) = reply_to {
            best_effort(
                "reply link",
                self.db.append_reply(&parent.to_string(), &id.to_string()),
            );
        }
        best_effort(
            "author message count",
            self.db.increment_message_count(&author.address),
        );

        info!("Message {} posted by {}", id, author.username);
        self.hub.publish(Change::Messages);
        Ok(id)
    }

    /// The current window: the most recent `feed_window` messages, oldest first.
    ///
    /// Malformed documents (no author, handle or text) are dropped rather than
    /// reported, so one bad record cannot blank the feed.
    pub fn list_messages(&self) -> Result<Vec<Message>> {
        let rows = self.db.recent_messages(self.config.feed_window)?;
        Ok(rows.into_iter().filter_map(convert::message).collect())
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        Ok(self.db.get_message(&id.to_string())?.and_then(convert::message))
    }

    /// Messages reported at least `min_reports` times, most reported first.
    pub fn flagged_messages(&self, min_reports: i64) -> Result<Vec<Message>> {
        let rows = self.db.messages_with_reports(min_reports)?;
        Ok(rows.into_iter().filter_map(convert::message).collect())
    }

    /// Live message window, re-delivered in full after every message change.
    pub async fn subscribe_messages(self: &Arc<Self>) -> Result<Subscription<Vec<Message>>> {
        self.live("messages", |c| *c == Change::Messages, |f: &Forum| f.list_messages())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::within;
    use crate::{ForumConfig, Identity};
    use forum_db::Database;

    fn forum_with(config: ForumConfig) -> Arc<Forum> {
        Arc::new(Forum::new(Database::open_in_memory().unwrap(), config))
    }

    fn user(forum: &Forum, address: &str) -> User {
        forum
            .login_user(&Identity {
                address: address.into(),
                username: Some(format!("@{}", address)),
                profile_picture_url: None,
                is_orb_verified: true,
            })
            .unwrap()
    }

    #[test]
    fn new_message_starts_with_zero_counters() {
        let forum = forum_with(ForumConfig::default());
        let alice = user(&forum, "0xa11ce");

        let id = forum.create_message(&alice, "  gm world  ", None).unwrap();
        let msg = forum.get_message(id).unwrap().unwrap();

        assert_eq!(msg.text, "gm world");
        assert_eq!((msg.upvotes, msg.downvotes, msg.report_count), (0, 0, 0));
        assert!(msg.replies.is_empty());
        assert!(!msg.is_edited);
        assert_eq!(forum.get_user("0xa11ce").unwrap().unwrap().message_count, 1);
    }

    #[test]
    fn text_is_validated_before_storage() {
        let forum = forum_with(ForumConfig {
            max_message_chars: 10,
            ..ForumConfig::default()
        });
        let alice = user(&forum, "0xa11ce");

        assert!(matches!(forum.create_message(&alice, "   ", None), Err(ForumError::Invalid(_))));
        assert!(matches!(forum.create_message(&alice, "😴", None), Err(ForumError::Invalid(_))));
        assert!(matches!(
            forum.create_message(&alice, "01234567890", None),
            Err(ForumError::Invalid(_))
        ));
        assert!(forum.create_message(&alice, "0123456789", None).is_ok());
        assert_eq!(forum.list_messages().unwrap().len(), 1);
    }

    #[test]
    fn reply_is_linked_into_parent() {
        let forum = forum_with(ForumConfig::default());
        let alice = user(&forum, "0xa11ce");
        let bob = user(&forum, "0xb0b");

        let parent = forum.create_message(&alice, "question?", None).unwrap();
        let reply = forum.create_message(&bob, "answer", Some(parent)).unwrap();

        assert_eq!(forum.get_message(parent).unwrap().unwrap().replies, vec![reply]);
        assert_eq!(forum.get_message(reply).unwrap().unwrap().reply_to, Some(parent));
    }

    #[test]
    fn reply_to_missing_parent_still_posts() {
        let forum = forum_with(ForumConfig::default());
        let alice = user(&forum, "0xa11ce");

        let orphan = forum.create_message(&alice, "hello?", Some(Uuid::new_v4())).unwrap();
        assert!(forum.get_message(orphan).unwrap().is_some());
    }

    #[test]
    fn unknown_author_does_not_fail_the_post() {
        let forum = forum_with(ForumConfig::default());
        let ghost = User {
            address: "0xghost".into(),
            username: "ghost".into(),
            is_orb_verified: false,
            profile_picture_url: None,
            created_at: Utc::now(),
            last_seen: Utc::now(),
            message_count: 0,
            reputation: 0,
        };
        assert!(forum.create_message(&ghost, "boo", None).is_ok());
    }

    #[test]
    fn window_is_capped_and_malformed_records_dropped() {
        let forum = forum_with(ForumConfig {
            feed_window: 3,
            ..ForumConfig::default()
        });
        let alice = user(&forum, "0xa11ce");
        for i in 0..4 {
            forum.create_message(&alice, &format!("m{}", i), None).unwrap();
        }
        forum
            .db()
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO messages (id, created_at) VALUES (?1, '9999-01-01T00:00:00.000Z')",
                    [Uuid::new_v4().to_string()],
                )?;
                Ok(())
            })
            .unwrap();

        let texts: Vec<String> = forum.list_messages().unwrap().into_iter().map(|m| m.text).collect();
        // The malformed record occupies one window slot but is not delivered
        assert_eq!(texts, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn subscription_redelivers_full_window() {
        let forum = forum_with(ForumConfig::default());
        let alice = user(&forum, "0xa11ce");
        forum.create_message(&alice, "first", None).unwrap();

        let mut feed = forum.subscribe_messages().await.unwrap();
        assert_eq!(feed.current().len(), 1);

        forum.create_message(&alice, "second", None).unwrap();
        let snapshot = within(feed.wait_for(|m| m.len() == 2)).await.unwrap();
        assert_eq!(snapshot[0].text, "first");
        assert_eq!(snapshot[1].text, "second");
    }
}
