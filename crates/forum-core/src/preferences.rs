use chrono::Utc;
use forum_db::format_timestamp;
use forum_types::models::UserPreferences;
use uuid::Uuid;

use crate::{Change, Forum, Result, best_effort, convert};

impl Forum {
    /// Stored preferences, or the defaults for a user who never saved any.
    pub fn preferences(&self, user: &str) -> Result<UserPreferences> {
        Ok(self
            .db
            .get_preferences(user)?
            .map(convert::preferences)
            .unwrap_or_else(|| UserPreferences::new(user, Utc::now())))
    }

    /// Remember the last message the user has seen. Best-effort.
    pub fn update_last_read(&self, user: &str, message_id: Uuid) {
        best_effort(
            "last-read position",
            self.db
                .set_last_read(user, &message_id.to_string(), &format_timestamp(Utc::now())),
        );
        self.hub.publish(Change::Preferences(user.to_string()));
    }

    pub fn set_display_preferences(
        &self,
        user: &str,
        dark_mode: Option<bool>,
        notifications: Option<bool>,
    ) -> Result<UserPreferences> {
        self.db
            .set_display_preferences(user, dark_mode, notifications, &format_timestamp(Utc::now()))?;
        self.hub.publish(Change::Preferences(user.to_string()));
        self.preferences(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ForumConfig;
    use forum_db::Database;

    #[test]
    fn defaults_then_merged_updates() {
        let forum = Forum::new(Database::open_in_memory().unwrap(), ForumConfig::default());

        let prefs = forum.preferences("0xa11ce").unwrap();
        assert!(!prefs.dark_mode && prefs.notifications);
        assert_eq!(prefs.last_read_message_id, None);

        let m = Uuid::new_v4();
        forum.update_last_read("0xa11ce", m);
        let prefs = forum.set_display_preferences("0xa11ce", Some(true), Some(false)).unwrap();
        assert!(prefs.dark_mode);
        assert!(!prefs.notifications);
        assert_eq!(prefs.last_read_message_id, Some(m));
        assert!(prefs.last_read_at.is_some());
    }
}
