use crate::models::{
    AnnouncementRow, MessageRow, PreferencesRow, ReactionRow, ReportRow, UserRow, VoteRow,
};
use crate::Database;
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row};

/// Counter fields on a message document. Each adjustment is its own statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageCounter {
    Upvotes,
    Downvotes,
    Reports,
}

impl MessageCounter {
    fn column(self) -> &'static str {
        match self {
            Self::Upvotes => "upvotes",
            Self::Downvotes => "downvotes",
            Self::Reports => "report_count",
        }
    }
}

const USER_COLUMNS: &str = "address, username, is_orb_verified, profile_picture_url, created_at, last_seen, message_count, reputation";

const MESSAGE_COLUMNS: &str = "id, author_id, username, is_orb_verified, profile_picture_url, text, created_at, upvotes, downvotes, report_count, reply_to, replies, is_edited, edited_at";

const REPORT_COLUMNS: &str = "id, message_id, reporter_id, reporter_username, reason, status, created_at, reviewed_at, reviewed_by, notes";

const ANNOUNCEMENT_COLUMNS: &str = "id, content, kind, priority, is_active, is_dismissible, auto_hide, hide_after_secs, start_date, end_date, audience, styling, created_at, updated_at";

impl Database {
    // -- Users --

    /// Insert the user, or refresh the identity fields and `last_seen` of
    /// an existing one. Returns true when the row was created.
    ///
    /// Both statements run under one lock and one transaction, and the insert
    /// never conflicts, so racing first logins for an address both succeed.
    pub fn upsert_user(&self, user: &UserRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(address) DO NOTHING"
                ),
                rusqlite::params![
                    user.address,
                    user.username,
                    user.is_orb_verified,
                    user.profile_picture_url,
                    user.created_at,
                    user.last_seen,
                    user.message_count,
                    user.reputation,
                ],
            )? > 0;

            if !inserted {
                tx.execute(
                    "UPDATE users
                     SET username = ?2, is_orb_verified = ?3,
                         profile_picture_url = COALESCE(?4, profile_picture_url), last_seen = ?5
                     WHERE address = ?1",
                    rusqlite::params![
                        user.address,
                        user.username,
                        user.is_orb_verified,
                        user.profile_picture_url,
                        user.last_seen,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    pub fn get_user(&self, address: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE address = ?1"),
                [address],
                map_user,
            )
            .optional()
        })
    }

    pub fn increment_message_count(&self, address: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET message_count = message_count + 1 WHERE address = ?1",
                [address],
            )?;
            if changed == 0 {
                return Err(anyhow!("User not found: {}", address));
            }
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &MessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO messages ({MESSAGE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                rusqlite::params![
                    message.id,
                    message.author_id,
                    message.username,
                    message.is_orb_verified,
                    message.profile_picture_url,
                    message.text,
                    message.created_at,
                    message.upvotes,
                    message.downvotes,
                    message.report_count,
                    message.reply_to,
                    message.replies,
                    message.is_edited,
                    message.edited_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                [id],
                map_message,
            )
            .optional()
        })
    }

    /// The `limit` most recent messages, oldest first.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_recent_messages(conn, limit))
    }

    /// Messages whose stored report counter is at least `min_reports`.
    pub fn messages_with_reports(&self, min_reports: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE report_count >= ?1
                 ORDER BY report_count DESC, created_at DESC"
            ))?;
            let rows = stmt
                .query_map([min_reports], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Add `child_id` to the parent's reply list unless already present.
    pub fn append_reply(&self, parent_id: &str, child_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let raw: String = conn
                .query_row("SELECT replies FROM messages WHERE id = ?1", [parent_id], |row| {
                    row.get(0)
                })
                .optional()?
                .ok_or_else(|| anyhow!("Parent message not found: {}", parent_id))?;

            let mut replies: Vec<String> = serde_json::from_str(&raw)?;
            if replies.iter().any(|r| r == child_id) {
                return Ok(());
            }
            replies.push(child_id.to_string());

            conn.execute(
                "UPDATE messages SET replies = ?2 WHERE id = ?1",
                rusqlite::params![parent_id, serde_json::to_string(&replies)?],
            )?;
            Ok(())
        })
    }

    /// Relative counter update, the equivalent of a document `increment(delta)`.
    pub fn adjust_message_counter(&self, id: &str, counter: MessageCounter, delta: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let column = counter.column();
            let changed = conn.execute(
                &format!("UPDATE messages SET {column} = {column} + ?2 WHERE id = ?1"),
                rusqlite::params![id, delta],
            )?;
            if changed == 0 {
                return Err(anyhow!("Message not found: {}", id));
            }
            Ok(())
        })
    }

    /// Both vote counters in one relative update, as a vote switch needs.
    pub fn adjust_vote_counters(&self, id: &str, up_delta: i64, down_delta: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET upvotes = upvotes + ?2, downvotes = downvotes + ?3 WHERE id = ?1",
                rusqlite::params![id, up_delta, down_delta],
            )?;
            if changed == 0 {
                return Err(anyhow!("Message not found: {}", id));
            }
            Ok(())
        })
    }

    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Votes --

    pub fn get_vote(&self, id: &str) -> Result<Option<VoteRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, message_id, user_id, choice, created_at FROM votes WHERE id = ?1",
                [id],
                map_vote,
            )
            .optional()
        })
    }

    /// Create or overwrite the vote document.
    pub fn put_vote(&self, vote: &VoteRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO votes (id, message_id, user_id, choice, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![vote.id, vote.message_id, vote.user_id, vote.choice, vote.created_at],
            )?;
            Ok(())
        })
    }

    pub fn set_vote_choice(&self, id: &str, choice: &str, created_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE votes SET choice = ?2, created_at = ?3 WHERE id = ?1",
                rusqlite::params![id, choice, created_at],
            )?;
            if changed == 0 {
                return Err(anyhow!("Vote not found: {}", id));
            }
            Ok(())
        })
    }

    pub fn delete_vote(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM votes WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn votes_for_message(&self, message_id: &str) -> Result<Vec<VoteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, user_id, choice, created_at FROM votes WHERE message_id = ?1",
            )?;
            let rows = stmt
                .query_map([message_id], map_vote)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reactions --

    /// Toggle a reaction: removes if exists, inserts if not.
    /// Returns true when the reaction was inserted.
    pub fn toggle_reaction(
        &self,
        id: &str,
        message_id: &str,
        user_id: &str,
        emoji: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row("SELECT id FROM reactions WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;

            if existing.is_some() {
                conn.execute("DELETE FROM reactions WHERE id = ?1", [id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, message_id, user_id, emoji, created_at],
                )?;
                Ok(true)
            }
        })
    }

    /// Every reaction on one message, in creation order.
    pub fn reactions_for_message(&self, message_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, user_id, emoji, created_at FROM reactions
                 WHERE message_id = ?1
                 ORDER BY created_at, rowid",
            )?;

            let rows = stmt
                .query_map([message_id], |row| {
                    Ok(ReactionRow {
                        id: row.get(0)?,
                        message_id: row.get(1)?,
                        user_id: row.get(2)?,
                        emoji: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Reports --

    pub fn insert_report(&self, report: &ReportRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!("INSERT INTO reports ({REPORT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
                rusqlite::params![
                    report.id,
                    report.message_id,
                    report.reporter_id,
                    report.reporter_username,
                    report.reason,
                    report.status,
                    report.created_at,
                    report.reviewed_at,
                    report.reviewed_by,
                    report.notes,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<ReportRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
                [id],
                map_report,
            )
            .optional()
        })
    }

    /// Reviewer and notes only overwrite the stored values when given.
    /// Returns false if no such report exists.
    pub fn update_report_status(
        &self,
        id: &str,
        status: &str,
        reviewed_at: &str,
        reviewed_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE reports
                 SET status = ?2, reviewed_at = ?3,
                     reviewed_by = COALESCE(?4, reviewed_by), notes = COALESCE(?5, notes)
                 WHERE id = ?1",
                rusqlite::params![id, status, reviewed_at, reviewed_by, notes],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn reports_for_message(&self, message_id: &str) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports WHERE message_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([message_id], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// All reports, or only those with `status`, newest first.
    pub fn list_reports(&self, status: Option<&str>) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([status], map_report)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Announcements --

    pub fn insert_announcement(&self, a: &AnnouncementRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO announcements ({ANNOUNCEMENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                rusqlite::params![
                    a.id,
                    a.content,
                    a.kind,
                    a.priority,
                    a.is_active,
                    a.is_dismissible,
                    a.auto_hide,
                    a.hide_after_secs,
                    a.start_date,
                    a.end_date,
                    a.audience,
                    a.styling,
                    a.created_at,
                    a.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_announcement(&self, id: &str) -> Result<Option<AnnouncementRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements WHERE id = ?1"),
                [id],
                map_announcement,
            )
            .optional()
        })
    }

    pub fn active_announcements(&self) -> Result<Vec<AnnouncementRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcements
                 WHERE is_active = 1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([], map_announcement)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_announcements(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM announcements", [], |row| row.get(0))?)
        })
    }

    // -- Preferences --

    pub fn get_preferences(&self, user_id: &str) -> Result<Option<PreferencesRow>> {
        self.with_conn(|conn| query_preferences(conn, user_id))
    }

    /// Merge-write of the last-read position.
    pub fn set_last_read(&self, user_id: &str, message_id: &str, at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, last_read_message_id, last_read_at, last_updated)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    last_read_message_id = excluded.last_read_message_id,
                    last_read_at = excluded.last_read_at,
                    last_updated = excluded.last_updated",
                rusqlite::params![user_id, message_id, at],
            )?;
            Ok(())
        })
    }

    /// Merge-write of the display flags; `None` keeps the stored value.
    pub fn set_display_preferences(
        &self,
        user_id: &str,
        dark_mode: Option<bool>,
        notifications: Option<bool>,
        at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, dark_mode, notifications, last_updated)
                 VALUES (?1, COALESCE(?2, 0), COALESCE(?3, 1), ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    dark_mode = COALESCE(?2, dark_mode),
                    notifications = COALESCE(?3, notifications),
                    last_updated = ?4",
                rusqlite::params![user_id, dark_mode, notifications, at],
            )?;
            Ok(())
        })
    }

    pub fn add_dismissed_announcement(&self, user_id: &str, announcement_id: &str, at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_preferences (user_id, last_updated) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO NOTHING",
                rusqlite::params![user_id, at],
            )?;

            let raw: String = conn.query_row(
                "SELECT dismissed_announcements FROM user_preferences WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            let mut dismissed: Vec<String> = serde_json::from_str(&raw)?;
            if !dismissed.iter().any(|d| d == announcement_id) {
                dismissed.push(announcement_id.to_string());
            }

            conn.execute(
                "UPDATE user_preferences SET dismissed_announcements = ?2, last_updated = ?3 WHERE user_id = ?1",
                rusqlite::params![user_id, serde_json::to_string(&dismissed)?, at],
            )?;
            Ok(())
        })
    }
}

fn query_recent_messages(conn: &Connection, limit: u32) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?1"
    ))?;

    let mut rows = stmt
        .query_map([limit], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.reverse();

    Ok(rows)
}

fn query_preferences(conn: &Connection, user_id: &str) -> Result<Option<PreferencesRow>> {
    conn.query_row(
        "SELECT user_id, dark_mode, notifications, last_read_message_id, last_read_at,
                dismissed_announcements, last_updated
         FROM user_preferences WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(PreferencesRow {
                user_id: row.get(0)?,
                dark_mode: row.get(1)?,
                notifications: row.get(2)?,
                last_read_message_id: row.get(3)?,
                last_read_at: row.get(4)?,
                dismissed_announcements: row.get(5)?,
                last_updated: row.get(6)?,
            })
        },
    )
    .optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        address: row.get(0)?,
        username: row.get(1)?,
        is_orb_verified: row.get(2)?,
        profile_picture_url: row.get(3)?,
        created_at: row.get(4)?,
        last_seen: row.get(5)?,
        message_count: row.get(6)?,
        reputation: row.get(7)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        username: row.get(2)?,
        is_orb_verified: row.get(3)?,
        profile_picture_url: row.get(4)?,
        text: row.get(5)?,
        created_at: row.get(6)?,
        upvotes: row.get(7)?,
        downvotes: row.get(8)?,
        report_count: row.get(9)?,
        reply_to: row.get(10)?,
        replies: row.get(11)?,
        is_edited: row.get(12)?,
        edited_at: row.get(13)?,
    })
}

fn map_vote(row: &Row<'_>) -> rusqlite::Result<VoteRow> {
    Ok(VoteRow {
        id: row.get(0)?,
        message_id: row.get(1)?,
        user_id: row.get(2)?,
        choice: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_report(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        message_id: row.get(1)?,
        reporter_id: row.get(2)?,
        reporter_username: row.get(3)?,
        reason: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        reviewed_at: row.get(7)?,
        reviewed_by: row.get(8)?,
        notes: row.get(9)?,
    })
}

fn map_announcement(row: &Row<'_>) -> rusqlite::Result<AnnouncementRow> {
    Ok(AnnouncementRow {
        id: row.get(0)?,
        content: row.get(1)?,
        kind: row.get(2)?,
        priority: row.get(3)?,
        is_active: row.get(4)?,
        is_dismissible: row.get(5)?,
        auto_hide: row.get(6)?,
        hide_after_secs: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        audience: row.get(10)?,
        styling: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
