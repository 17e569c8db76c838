//! Database row types. These map directly to SQLite rows.
//! Distinct from forum-types models so the store stays independent; ids and
//! timestamps are kept as stored text and parsed by the services.

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub address: String,
    pub username: String,
    pub is_orb_verified: bool,
    pub profile_picture_url: Option<String>,
    pub created_at: String,
    pub last_seen: String,
    pub message_count: i64,
    pub reputation: i64,
}

/// `author_id` and `text` are optional because a stored document may be
/// missing them.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub author_id: Option<String>,
    pub username: Option<String>,
    pub is_orb_verified: bool,
    pub profile_picture_url: Option<String>,
    pub text: Option<String>,
    pub created_at: String,
    pub upvotes: i64,
    pub downvotes: i64,
    pub report_count: i64,
    pub reply_to: Option<String>,
    /// JSON array of child message ids
    pub replies: String,
    pub is_edited: bool,
    pub edited_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub choice: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRow {
    pub id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub id: String,
    pub message_id: String,
    pub reporter_id: String,
    pub reporter_username: String,
    pub reason: String,
    pub status: String,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementRow {
    pub id: String,
    pub content: String,
    pub kind: String,
    pub priority: String,
    pub is_active: bool,
    pub is_dismissible: bool,
    pub auto_hide: bool,
    pub hide_after_secs: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub audience: String,
    /// JSON object, see `forum_types::models::Styling`
    pub styling: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreferencesRow {
    pub user_id: String,
    pub dark_mode: bool,
    pub notifications: bool,
    pub last_read_message_id: Option<String>,
    pub last_read_at: Option<String>,
    /// JSON array of announcement ids
    pub dismissed_announcements: String,
    pub last_updated: String,
}
