use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// A forum participant, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub address: String,
    pub username: String,
    pub is_orb_verified: bool,
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub message_count: i64,
    pub reputation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub author: String,
    pub username: String,
    pub is_orb_verified: bool,
    pub profile_picture_url: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Counters are maintained by independent increments and may drift from
    /// the vote and report records they summarize.
    pub upvotes: i64,
    pub downvotes: i64,
    pub report_count: i64,
    pub reply_to: Option<Uuid>,
    pub replies: Vec<Uuid>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
}

// -- Votes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Up,
    Down,
}

impl VoteChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

impl FromStr for VoteChoice {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            other => Err(UnknownVariant::new("vote choice", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub message_id: Uuid,
    pub user: String,
    pub choice: VoteChoice,
    pub created_at: DateTime<Utc>,
}

/// Deterministic document key for the single vote a user may hold on a message.
pub fn vote_key(message_id: Uuid, user: &str) -> String {
    format!("{}_{}", message_id, user)
}

// -- Reactions --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: Uuid,
    pub user: String,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Deterministic document key for one (message, user, emoji) reaction.
pub fn reaction_key(message_id: Uuid, user: &str, emoji: &str) -> String {
    format!("{}_{}_{}", message_id, user, emoji)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub count: usize,
    pub users: Vec<String>,
}

/// Emoji -> participants, recomputed from the full reaction set of a message.
pub type ReactionMap = BTreeMap<String, ReactionSummary>;

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(UnknownVariant::new("report status", other)),
        }
    }
}

/// Reasons offered by the report dialog. `Other` carries free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportReason {
    Spam,
    Scam,
    Misleading,
    Other(String),
}

impl fmt::Display for ReportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spam => f.write_str("Spam"),
            Self::Scam => f.write_str("Scam"),
            Self::Misleading => f.write_str("Misleading"),
            Self::Other(text) => write!(f, "Other: {}", text),
        }
    }
}

impl FromStr for ReportReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "Spam" => Ok(Self::Spam),
            "Scam" => Ok(Self::Scam),
            "Misleading" => Ok(Self::Misleading),
            _ => match s.strip_prefix("Other") {
                Some(rest) => {
                    let text = rest.trim_start_matches(':').trim();
                    Ok(Self::Other(text.to_string()))
                }
                None => Err(UnknownVariant::new("report reason", s)),
            },
        }
    }
}

impl Serialize for ReportReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReportReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub message_id: Uuid,
    pub reporter: String,
    pub reporter_username: String,
    /// Stored as rendered text so moderators see exactly what was submitted.
    pub reason: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub notes: Option<String>,
}

// -- Announcements --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    Info,
    Warning,
    Success,
    Error,
}

impl AnnouncementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl FromStr for AnnouncementKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(UnknownVariant::new("announcement type", other)),
        }
    }
}

/// Declared low to high so the derived `Ord` ranks `High` greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            other => Err(UnknownVariant::new("priority", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Verified,
    NewUsers,
}

impl Audience {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Verified => "verified",
            Self::NewUsers => "new_users",
        }
    }
}

impl FromStr for Audience {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "verified" => Ok(Self::Verified),
            "new_users" => Ok(Self::NewUsers),
            other => Err(UnknownVariant::new("audience", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Styling {
    pub background_color: String,
    pub text_color: String,
    pub border_color: Option<String>,
    pub icon_emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: AnnouncementKind,
    pub priority: Priority,
    pub is_active: bool,
    pub is_dismissible: bool,
    pub auto_hide: bool,
    pub hide_after_secs: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub audience: Audience,
    pub styling: Option<Styling>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Active and inside its optional date window.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date.is_none_or(|start| start <= now)
            && self.end_date.is_none_or(|end| now <= end)
    }
}

// -- Preferences --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user: String,
    pub dark_mode: bool,
    pub notifications: bool,
    pub last_read_message_id: Option<Uuid>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub dismissed_announcements: Vec<Uuid>,
    pub last_updated: DateTime<Utc>,
}

impl UserPreferences {
    pub fn new(user: &str, now: DateTime<Utc>) -> Self {
        Self {
            user: user.to_string(),
            dark_mode: false,
            notifications: true,
            last_read_message_id: None,
            last_read_at: None,
            dismissed_announcements: Vec::new(),
            last_updated: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_reason_parses_dialog_choices() {
        assert_eq!("Spam".parse::<ReportReason>().unwrap(), ReportReason::Spam);
        assert_eq!(
            "Other: bot account".parse::<ReportReason>().unwrap(),
            ReportReason::Other("bot account".into())
        );
        assert_eq!(ReportReason::Other("x".into()).to_string(), "Other: x");
        assert!("Rude".parse::<ReportReason>().is_err());
    }

    #[test]
    fn composite_keys_are_deterministic() {
        let id = Uuid::nil();
        assert_eq!(vote_key(id, "0xabc"), format!("{}_0xabc", id));
        assert_eq!(reaction_key(id, "0xabc", "🔥"), format!("{}_0xabc_🔥", id));
    }

    #[test]
    fn priority_orders_high_first_when_reversed() {
        let mut p = vec![Priority::Normal, Priority::High, Priority::Low];
        p.sort_by(|a, b| b.cmp(a));
        assert_eq!(p, vec![Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn announcement_window() {
        let now = Utc::now();
        let mut a = Announcement {
            id: Uuid::new_v4(),
            content: "hi".into(),
            kind: AnnouncementKind::Info,
            priority: Priority::Normal,
            is_active: true,
            is_dismissible: true,
            auto_hide: false,
            hide_after_secs: None,
            start_date: Some(now - chrono::Duration::hours(1)),
            end_date: Some(now + chrono::Duration::hours(1)),
            audience: Audience::All,
            styling: None,
            created_at: now,
            updated_at: now,
        };
        assert!(a.is_live_at(now));
        a.end_date = Some(now - chrono::Duration::minutes(1));
        assert!(!a.is_live_at(now));
        a.end_date = None;
        a.is_active = false;
        assert!(!a.is_live_at(now));
    }
}
