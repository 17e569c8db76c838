use std::sync::Arc;

use chrono::{DateTime, Utc};
use forum_db::format_timestamp;
use forum_db::models::AnnouncementRow;
use forum_types::api::AnnouncementDraft;
use forum_types::models::{Announcement, AnnouncementKind, Audience, Priority, Styling, User};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Change, Forum, ForumError, Moderator, Result, Subscription, best_effort, convert};

impl Forum {
    /// Announcements the user should see right now: live, aimed at them and
    /// not dismissed. Highest priority first, then newest.
    pub fn active_announcements(&self, user: &User) -> Result<Vec<Announcement>> {
        self.announcements_at(user, Utc::now())
    }

    fn announcements_at(&self, user: &User, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        let dismissed = match self.db.get_preferences(&user.address) {
            Ok(row) => row.map(convert::preferences).map(|p| p.dismissed_announcements).unwrap_or_default(),
            Err(e) => {
                warn!("Failed to read dismissals for {}: {}", user.address, e);
                Vec::new()
            }
        };

        let mut live: Vec<Announcement> = self
            .db
            .active_announcements()?
            .into_iter()
            .filter_map(convert::announcement)
            .filter(|a| a.is_live_at(now))
            .filter(|a| self.targets(a.audience, user))
            .filter(|a| !(a.is_dismissible && dismissed.contains(&a.id)))
            .collect();

        live.sort_by(|a, b| b.priority.cmp(&a.priority).then(b.created_at.cmp(&a.created_at)));
        Ok(live)
    }

    fn targets(&self, audience: Audience, user: &User) -> bool {
        match audience {
            Audience::All => true,
            Audience::Verified => user.is_orb_verified,
            Audience::NewUsers => user.message_count < self.config.new_user_threshold,
        }
    }

    pub fn create_announcement(&self, moderator: &Moderator, draft: &AnnouncementDraft) -> Result<Uuid> {
        if draft.content.trim().is_empty() {
            return Err(ForumError::invalid("announcement content is empty"));
        }
        if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
            if end < start {
                return Err(ForumError::invalid("announcement ends before it starts"));
            }
        }

        let id = Uuid::new_v4();
        let now = format_timestamp(Utc::now());
        let styling = draft
            .styling
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(anyhow::Error::from)?;

        self.db.insert_announcement(&AnnouncementRow {
            id: id.to_string(),
            content: draft.content.trim().to_string(),
            kind: draft.kind.as_str().to_string(),
            priority: draft.priority.as_str().to_string(),
            is_active: draft.is_active,
            is_dismissible: draft.is_dismissible,
            auto_hide: draft.auto_hide,
            hide_after_secs: draft.hide_after_secs.and_then(|s| i64::try_from(s).ok()),
            start_date: draft.start_date.map(format_timestamp),
            end_date: draft.end_date.map(format_timestamp),
            audience: draft.audience.as_str().to_string(),
            styling,
            created_at: now.clone(),
            updated_at: now,
        })?;

        info!("Announcement {} created by {}", id, moderator.reviewer());
        self.hub.publish(Change::Announcements);
        Ok(id)
    }

    /// Hide an announcement for this user. Persisting the dismissal is
    /// best-effort; a lost write only means the banner shows again.
    pub fn dismiss_announcement(&self, user: &str, announcement_id: Uuid) -> Result<()> {
        let announcement = self
            .db
            .get_announcement(&announcement_id.to_string())?
            .and_then(convert::announcement)
            .ok_or(ForumError::NotFound("announcement"))?;
        if !announcement.is_dismissible {
            return Err(ForumError::invalid("announcement cannot be dismissed"));
        }

        best_effort(
            "announcement dismissal",
            self.db.add_dismissed_announcement(
                user,
                &announcement_id.to_string(),
                &format_timestamp(Utc::now()),
            ),
        );
        self.hub.publish(Change::Preferences(user.to_string()));
        Ok(())
    }

    /// Live banner list for one user, recomputed when announcements change
    /// or the user dismisses one.
    pub async fn subscribe_announcements(
        self: &Arc<Self>,
        address: &str,
    ) -> Result<Subscription<Vec<Announcement>>> {
        let owner = address.to_string();
        let address = address.to_string();
        self.live(
            "announcements",
            move |c| match c {
                Change::Announcements => true,
                Change::Preferences(user) => *user == owner,
                _ => false,
            },
            move |f: &Forum| {
                let user = f.get_user(&address)?.ok_or(ForumError::NotFound("user"))?;
                f.active_announcements(&user)
            },
        )
        .await
    }

    /// Insert the welcome banner into an empty collection. Returns whether
    /// anything was written.
    pub fn seed_welcome_announcement(&self) -> Result<bool> {
        if self.db.count_announcements()? > 0 {
            return Ok(false);
        }
        let draft = AnnouncementDraft {
            content: "Welcome to the forum! Connect with verified humans and join the conversation.".into(),
            kind: AnnouncementKind::Info,
            priority: Priority::High,
            is_active: true,
            is_dismissible: true,
            auto_hide: false,
            hide_after_secs: None,
            start_date: None,
            end_date: None,
            audience: Audience::All,
            styling: Some(Styling {
                background_color: "#3B82F6".into(),
                text_color: "#FFFFFF".into(),
                border_color: None,
                icon_emoji: Some("🎉".into()),
            }),
        };
        self.create_announcement(&Moderator::system(), &draft)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ForumConfig, Identity};
    use chrono::Duration;
    use forum_db::Database;

    fn draft(content: &str) -> AnnouncementDraft {
        serde_json::from_value(serde_json::json!({ "content": content })).unwrap()
    }

    fn setup() -> (Forum, User) {
        let forum = Forum::new(Database::open_in_memory().unwrap(), ForumConfig::default());
        let user = forum
            .login_user(&Identity {
                address: "0xa11ce".into(),
                username: None,
                profile_picture_url: None,
                is_orb_verified: false,
            })
            .unwrap();
        (forum, user)
    }

    #[test]
    fn seeding_happens_once() {
        let (forum, user) = setup();
        assert!(forum.seed_welcome_announcement().unwrap());
        assert!(!forum.seed_welcome_announcement().unwrap());
        let shown = forum.active_announcements(&user).unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].priority, Priority::High);
    }

    #[test]
    fn audience_window_and_order() {
        let (forum, user) = setup();
        let system = Moderator::system();
        let now = Utc::now();

        let mut low = draft("low");
        low.priority = Priority::Low;
        forum.create_announcement(&system, &low).unwrap();

        let mut high = draft("high");
        high.priority = Priority::High;
        forum.create_announcement(&system, &high).unwrap();

        let mut verified_only = draft("verified only");
        verified_only.audience = Audience::Verified;
        forum.create_announcement(&system, &verified_only).unwrap();

        let mut expired = draft("expired");
        expired.end_date = Some(now - Duration::hours(1));
        forum.create_announcement(&system, &expired).unwrap();

        let mut inactive = draft("inactive");
        inactive.is_active = false;
        forum.create_announcement(&system, &inactive).unwrap();

        let shown: Vec<String> = forum
            .active_announcements(&user)
            .unwrap()
            .into_iter()
            .map(|a| a.content)
            .collect();
        assert_eq!(shown, vec!["high", "low"]);
    }

    #[test]
    fn dismissal_hides_only_dismissible_banners() {
        let (forum, user) = setup();
        let system = Moderator::system();
        let gone = forum.create_announcement(&system, &draft("dismiss me")).unwrap();
        let mut sticky = draft("sticky");
        sticky.is_dismissible = false;
        let sticky = forum.create_announcement(&system, &sticky).unwrap();

        forum.dismiss_announcement(&user.address, gone).unwrap();
        assert!(matches!(
            forum.dismiss_announcement(&user.address, sticky),
            Err(ForumError::Invalid(_))
        ));
        assert!(matches!(
            forum.dismiss_announcement(&user.address, Uuid::new_v4()),
            Err(ForumError::NotFound("announcement"))
        ));

        let shown = forum.active_announcements(&user).unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].content, "sticky");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let (forum, _) = setup();
        let mut bad = draft("bad");
        bad.start_date = Some(Utc::now());
        bad.end_date = Some(Utc::now() - Duration::days(1));
        assert!(matches!(
            forum.create_announcement(&Moderator::system(), &bad),
            Err(ForumError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn banner_subscription_follows_creation_and_dismissal() {
        let (forum, user) = setup();
        let forum = Arc::new(forum);
        let mut banners = forum.subscribe_announcements(&user.address).await.unwrap();
        assert!(banners.current().is_empty());

        let id = forum
            .create_announcement(&Moderator::system(), &draft("maintenance"))
            .unwrap();
        crate::hub::within(banners.wait_for(|b| b.len() == 1)).await.unwrap();

        // Someone else's dismissal leaves this view alone
        forum.dismiss_announcement("0xb0b", id).unwrap();
        forum.dismiss_announcement(&user.address, id).unwrap();
        crate::hub::within(banners.wait_for(|b| b.is_empty())).await.unwrap();
    }
}
