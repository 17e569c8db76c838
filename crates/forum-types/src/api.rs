use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AnnouncementKind, Audience, Priority, ReportReason, ReportStatus, Styling, User, VoteChoice,
};

// -- Session Claims --

/// JWT claims shared by the REST middleware and the gateway upgrade.
/// `sub` is the wallet address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

/// Payload produced by the wallet-authentication widget.
/// `username`, `profile_picture_url` and `is_orb_verified` are only trusted
/// when no identity provider is configured.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalletLoginRequest {
    pub address: String,
    pub message: String,
    pub signature: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub is_orb_verified: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FlaggedQuery {
    #[serde(default = "default_min_reports")]
    pub min_reports: i64,
}

fn default_min_reports() -> i64 {
    2
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteMessageResponse {
    pub deleted_message: bool,
    pub updated_reports: usize,
}

// -- Votes --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub choice: VoteChoice,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub vote: Option<VoteChoice>,
}

// -- Reactions --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleReactionResponse {
    pub added: bool,
}

// -- Reports --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    pub reason: ReportReason,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReportRequest {
    pub status: ReportStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

// -- Announcements --

/// Fields a moderator supplies; ids and timestamps are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnouncementDraft {
    pub content: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: AnnouncementKind,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_dismissible: bool,
    #[serde(default)]
    pub auto_hide: bool,
    #[serde(default)]
    pub hide_after_secs: Option<u64>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_audience")]
    pub audience: Audience,
    #[serde(default)]
    pub styling: Option<Styling>,
}

fn default_kind() -> AnnouncementKind {
    AnnouncementKind::Info
}

fn default_priority() -> Priority {
    Priority::Normal
}

fn default_audience() -> Audience {
    Audience::All
}

fn default_true() -> bool {
    true
}

// -- Preferences --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LastReadRequest {
    pub message_id: Uuid,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisplayPreferencesRequest {
    #[serde(default)]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub notifications: Option<bool>,
}

// -- Rate limit --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub ceiling: u32,
    pub remaining: u32,
    pub notice_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry_after_secs: Option<u64>,
}
