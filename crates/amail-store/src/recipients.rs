//! Per-recipient state changes. Each call is a single statement and touches
//! exactly one recipient's rows; the message itself is never modified.
//!
//! Mutators report whether a row matched, so callers can tell "not in your
//! inbox" from success without a second query.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::Result;
use crate::messages::{format_timestamp, parse_enum, parse_timestamp};
use crate::models::Recipient;

impl Database {
    /// Set status to read and stamp `read_at`. Re-running on a read row is
    /// not an error; `read_at` moves to the latest call.
    pub fn mark_read(&self, message_id: &str, to_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE recipients SET status = 'read', read_at = ?1
             WHERE message_id = ?2 AND to_id = ?3",
            params![format_timestamp(&Utc::now()), message_id, to_id],
        )?;
        tracing::debug!(message_id, to_id, affected, "marked read");
        Ok(affected > 0)
    }

    /// Mark every unread message for `to_id` as read. Returns how many rows
    /// changed from unread to read.
    pub fn mark_all_read(&self, to_id: &str) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE recipients SET status = 'read', read_at = ?1
             WHERE to_id = ?2 AND status = 'unread'",
            params![format_timestamp(&Utc::now()), to_id],
        )?;
        tracing::debug!(to_id, affected, "marked all read");
        Ok(affected)
    }

    pub fn archive(&self, message_id: &str, to_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE recipients SET status = 'archived'
             WHERE message_id = ?1 AND to_id = ?2",
            params![message_id, to_id],
        )?;
        tracing::debug!(message_id, to_id, affected, "archived");
        Ok(affected > 0)
    }

    /// Remove the message from one recipient's inbox. Other recipients and
    /// the message row are untouched.
    pub fn delete(&self, message_id: &str, to_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM recipients WHERE message_id = ?1 AND to_id = ?2",
            params![message_id, to_id],
        )?;
        tracing::debug!(message_id, to_id, affected, "deleted from inbox");
        Ok(affected > 0)
    }

    /// Record that notifications were dispatched for this row.
    pub fn mark_notified(&self, message_id: &str, to_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE recipients SET notified_at = ?1
             WHERE message_id = ?2 AND to_id = ?3",
            params![format_timestamp(&Utc::now()), message_id, to_id],
        )?;
        Ok(affected > 0)
    }

    pub fn get_recipient(&self, message_id: &str, to_id: &str) -> Result<Option<Recipient>> {
        let recipient = self
            .conn()
            .query_row(
                "SELECT message_id, to_id, status, read_at, notified_at
                 FROM recipients WHERE message_id = ?1 AND to_id = ?2",
                params![message_id, to_id],
                row_to_recipient,
            )
            .optional()?;
        Ok(recipient)
    }
}

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
    let status: String = row.get(2)?;
    let read_at: Option<String> = row.get(3)?;
    let notified_at: Option<String> = row.get(4)?;

    Ok(Recipient {
        message_id: row.get(0)?,
        to_id: row.get(1)?,
        status: parse_enum(2, &status)?,
        read_at: read_at.map(|raw| parse_timestamp(3, &raw)).transpose()?,
        notified_at: notified_at.map(|raw| parse_timestamp(4, &raw)).transpose()?,
    })
}
