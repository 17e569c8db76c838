//! Row -> model conversion. Corrupt scalar fields are logged and replaced
//! with a neutral value; whole-document tolerance decisions live with the
//! services that read the documents.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use forum_db::models::{AnnouncementRow, MessageRow, PreferencesRow, ReportRow, UserRow};
use forum_db::parse_timestamp;
use forum_types::models::{
    Announcement, AnnouncementKind, Audience, Message, Priority, Report, ReportStatus, User,
    UserPreferences,
};
use tracing::{debug, warn};
use uuid::Uuid;

pub(crate) fn timestamp(raw: &str, field: &str, owner: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on '{}'", field, raw, owner);
        DateTime::<Utc>::default()
    })
}

fn opt_timestamp(raw: Option<&str>, field: &str, owner: &str) -> Option<DateTime<Utc>> {
    raw.map(|r| timestamp(r, field, owner))
}

fn id_list(raw: &str, field: &str, owner: &str) -> Vec<Uuid> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(ids) => ids.iter().filter_map(|id| id.parse().ok()).collect(),
        Err(e) => {
            warn!("Corrupt {} on '{}': {}", field, owner, e);
            Vec::new()
        }
    }
}

fn tag<T: FromStr + Copy>(raw: &str, fallback: T, owner: &str) -> T
where
    T::Err: std::fmt::Display,
{
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt tag on '{}': {}", owner, e);
        fallback
    })
}

pub(crate) fn user(row: UserRow) -> User {
    User {
        created_at: timestamp(&row.created_at, "created_at", &row.address),
        last_seen: timestamp(&row.last_seen, "last_seen", &row.address),
        address: row.address,
        username: row.username,
        is_orb_verified: row.is_orb_verified,
        profile_picture_url: row.profile_picture_url,
        message_count: row.message_count,
        reputation: row.reputation,
    }
}

/// `None` for a malformed document: no usable id, author, handle or text.
pub(crate) fn message(row: MessageRow) -> Option<Message> {
    let id: Uuid = match row.id.parse() {
        Ok(id) => id,
        Err(e) => {
            debug!("Dropping message with corrupt id '{}': {}", row.id, e);
            return None;
        }
    };

    let (author, username, text) = match (row.author_id, row.username, row.text) {
        (Some(a), Some(u), Some(t)) if !a.is_empty() && !u.is_empty() && !t.is_empty() => (a, u, t),
        _ => {
            debug!("Dropping malformed message document '{}'", row.id);
            return None;
        }
    };

    let owner = row.id.as_str();
    Some(Message {
        id,
        author,
        username,
        is_orb_verified: row.is_orb_verified,
        profile_picture_url: row.profile_picture_url,
        text,
        created_at: timestamp(&row.created_at, "created_at", owner),
        upvotes: row.upvotes,
        downvotes: row.downvotes,
        report_count: row.report_count,
        reply_to: row.reply_to.as_deref().and_then(|r| r.parse().ok()),
        replies: id_list(&row.replies, "replies", owner),
        is_edited: row.is_edited,
        edited_at: opt_timestamp(row.edited_at.as_deref(), "edited_at", owner),
    })
}

pub(crate) fn report(row: ReportRow) -> Option<Report> {
    let id = row.id.parse().ok()?;
    let message_id = row.message_id.parse().ok()?;
    let owner = row.id.as_str();
    Some(Report {
        id,
        message_id,
        status: tag(&row.status, ReportStatus::Pending, owner),
        created_at: timestamp(&row.created_at, "created_at", owner),
        reviewed_at: opt_timestamp(row.reviewed_at.as_deref(), "reviewed_at", owner),
        reporter: row.reporter_id,
        reporter_username: row.reporter_username,
        reason: row.reason,
        reviewed_by: row.reviewed_by,
        notes: row.notes,
    })
}

pub(crate) fn announcement(row: AnnouncementRow) -> Option<Announcement> {
    let id = row.id.parse().ok()?;
    let owner = row.id.as_str();
    let styling = row.styling.as_deref().and_then(|raw| {
        serde_json::from_str(raw)
            .map_err(|e| warn!("Corrupt styling on announcement '{}': {}", owner, e))
            .ok()
    });
    Some(Announcement {
        id,
        kind: tag(&row.kind, AnnouncementKind::Info, owner),
        priority: tag(&row.priority, Priority::Normal, owner),
        audience: tag(&row.audience, Audience::All, owner),
        is_active: row.is_active,
        is_dismissible: row.is_dismissible,
        auto_hide: row.auto_hide,
        hide_after_secs: row.hide_after_secs.and_then(|s| u64::try_from(s).ok()),
        start_date: opt_timestamp(row.start_date.as_deref(), "start_date", owner),
        end_date: opt_timestamp(row.end_date.as_deref(), "end_date", owner),
        styling,
        created_at: timestamp(&row.created_at, "created_at", owner),
        updated_at: timestamp(&row.updated_at, "updated_at", owner),
        content: row.content,
    })
}

pub(crate) fn preferences(row: PreferencesRow) -> UserPreferences {
    let owner = row.user_id.as_str();
    UserPreferences {
        dark_mode: row.dark_mode,
        notifications: row.notifications,
        last_read_message_id: row.last_read_message_id.as_deref().and_then(|m| m.parse().ok()),
        last_read_at: opt_timestamp(row.last_read_at.as_deref(), "last_read_at", owner),
        dismissed_announcements: id_list(&row.dismissed_announcements, "dismissed_announcements", owner),
        last_updated: timestamp(&row.last_updated, "last_updated", owner),
        user: row.user_id,
    }
}
