//! v001 -- Initial schema: `messages` and `recipients`.
//!
//! Timestamps are RFC 3339 text in UTC with a fixed nine-digit fraction, so
//! lexical order equals chronological order.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Messages (immutable once sent)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,    -- 16 hex chars
    from_id     TEXT NOT NULL,                -- sender role
    subject     TEXT NOT NULL DEFAULT '',
    body        TEXT NOT NULL,
    priority    TEXT NOT NULL DEFAULT 'normal',
    msg_type    TEXT NOT NULL DEFAULT 'message',
    thread_id   TEXT REFERENCES messages(id), -- thread root
    reply_to_id TEXT REFERENCES messages(id), -- direct parent
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f000000Z', 'now'))
);

-- ----------------------------------------------------------------
-- Recipients (per-recipient delivery state)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recipients (
    message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
    to_id       TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'unread',
    read_at     TEXT,
    notified_at TEXT,
    PRIMARY KEY (message_id, to_id)
);

CREATE INDEX IF NOT EXISTS idx_inbox ON recipients(to_id, status);
CREATE INDEX IF NOT EXISTS idx_thread ON messages(thread_id);
CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at DESC);
"#;

/// Apply the initial schema.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
