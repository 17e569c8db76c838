use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Applies every schema version the database has not seen yet.
///
/// Foreign keys stay off: reports must survive the deletion of the message
/// they reference, and replies may point at a parent that was removed.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (forum collections)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                address             TEXT PRIMARY KEY,
                username            TEXT NOT NULL,
                is_orb_verified     INTEGER NOT NULL DEFAULT 0,
                profile_picture_url TEXT,
                created_at          TEXT NOT NULL,
                last_seen           TEXT NOT NULL,
                message_count       INTEGER NOT NULL DEFAULT 0,
                reputation          INTEGER NOT NULL DEFAULT 0
            );

            -- author_id and text are nullable: readers drop malformed documents
            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                author_id           TEXT,
                username            TEXT,
                is_orb_verified     INTEGER NOT NULL DEFAULT 0,
                profile_picture_url TEXT,
                text                TEXT,
                created_at          TEXT NOT NULL,
                upvotes             INTEGER NOT NULL DEFAULT 0,
                downvotes           INTEGER NOT NULL DEFAULT 0,
                report_count        INTEGER NOT NULL DEFAULT 0,
                reply_to            TEXT,
                replies             TEXT NOT NULL DEFAULT '[]',
                is_edited           INTEGER NOT NULL DEFAULT 0,
                edited_at           TEXT
            );

            CREATE INDEX idx_messages_created ON messages(created_at);

            CREATE TABLE votes (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                choice      TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_votes_message ON votes(message_id);

            CREATE TABLE reactions (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                emoji       TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_reactions_message ON reactions(message_id);

            CREATE TABLE reports (
                id                  TEXT PRIMARY KEY,
                message_id          TEXT NOT NULL,
                reporter_id         TEXT NOT NULL,
                reporter_username   TEXT NOT NULL,
                reason              TEXT NOT NULL,
                status              TEXT NOT NULL DEFAULT 'pending',
                created_at          TEXT NOT NULL,
                reviewed_at         TEXT,
                reviewed_by         TEXT,
                notes               TEXT
            );

            CREATE INDEX idx_reports_message ON reports(message_id);
            CREATE INDEX idx_reports_status ON reports(status);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (announcements, user preferences)");
        conn.execute_batch(
            "
            CREATE TABLE announcements (
                id              TEXT PRIMARY KEY,
                content         TEXT NOT NULL,
                kind            TEXT NOT NULL DEFAULT 'info',
                priority        TEXT NOT NULL DEFAULT 'normal',
                is_active       INTEGER NOT NULL DEFAULT 1,
                is_dismissible  INTEGER NOT NULL DEFAULT 1,
                auto_hide       INTEGER NOT NULL DEFAULT 0,
                hide_after_secs INTEGER,
                start_date      TEXT,
                end_date        TEXT,
                audience        TEXT NOT NULL DEFAULT 'all',
                styling         TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE user_preferences (
                user_id                 TEXT PRIMARY KEY,
                dark_mode               INTEGER NOT NULL DEFAULT 0,
                notifications           INTEGER NOT NULL DEFAULT 1,
                last_read_message_id    TEXT,
                last_read_at            TEXT,
                dismissed_announcements TEXT NOT NULL DEFAULT '[]',
                last_updated            TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
