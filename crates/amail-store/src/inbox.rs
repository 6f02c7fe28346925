//! Per-recipient views: inbox listings, counts and scoped prefix lookup.

use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::messages::{row_to_inbox, row_to_message, MESSAGE_COLUMNS};
use crate::models::InboxMessage;

impl Database {
    /// Messages addressed to `to_id`, newest first. Without `include_read`
    /// only unread rows are returned; with it, read and archived rows too.
    pub fn get_inbox(&self, to_id: &str, include_read: bool) -> Result<Vec<InboxMessage>> {
        self.query_inbox(to_id, None, include_read)
    }

    /// [`Database::get_inbox`] restricted to one sender.
    pub fn get_inbox_from(
        &self,
        to_id: &str,
        from_id: &str,
        include_read: bool,
    ) -> Result<Vec<InboxMessage>> {
        self.query_inbox(to_id, Some(from_id), include_read)
    }

    fn query_inbox(
        &self,
        to_id: &str,
        from_id: Option<&str>,
        include_read: bool,
    ) -> Result<Vec<InboxMessage>> {
        let status_filter = if include_read {
            ""
        } else {
            "AND r.status = 'unread'"
        };
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}, r.status, r.read_at
             FROM messages m
             JOIN recipients r ON r.message_id = m.id
             WHERE r.to_id = ?1 AND (?2 IS NULL OR m.from_id = ?2) {status_filter}
             ORDER BY m.created_at DESC, m.rowid DESC"
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![to_id, from_id], row_to_inbox)?;
        let mut messages = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        self.attach_recipients(&mut messages)?;
        Ok(messages)
    }

    /// One message as seen by `to_id`, or `None` if it is not in that inbox
    /// (never sent there, or deleted).
    pub fn get_message_for_recipient(
        &self,
        id: &str,
        to_id: &str,
    ) -> Result<Option<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}, r.status, r.read_at
             FROM messages m
             JOIN recipients r ON r.message_id = m.id
             WHERE m.id = ?1 AND r.to_id = ?2"
        );
        let found = self
            .conn()
            .query_row(&sql, params![id, to_id], row_to_inbox)
            .optional()?;

        let mut found: Vec<_> = found.into_iter().collect();
        self.attach_recipients(&mut found)?;
        Ok(found.pop())
    }

    /// Resolve a short id against `to_id`'s inbox (any status).
    ///
    /// `Ok(None)` when nothing matches, [`StoreError::AmbiguousPrefix`] when
    /// more than one message does.
    pub fn find_in_inbox_by_prefix(
        &self,
        prefix: &str,
        to_id: &str,
    ) -> Result<Option<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}, r.status, r.read_at
             FROM messages m
             JOIN recipients r ON r.message_id = m.id
             WHERE r.to_id = ?1 AND substr(m.id, 1, length(?2)) = ?2"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![to_id, prefix], row_to_inbox)?;
        let matches = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        self.single_match(prefix, matches)
    }

    /// Resolve a short id against the messages `from_id` sent, with the
    /// same zero/one/many policy as [`Database::find_in_inbox_by_prefix`].
    pub fn find_sent_by_prefix(
        &self,
        prefix: &str,
        from_id: &str,
    ) -> Result<Option<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             WHERE m.from_id = ?1 AND substr(m.id, 1, length(?2)) = ?2"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![from_id, prefix], row_to_message)?;
        let matches = rows
            .map(|row| row.map(InboxMessage::unscoped))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.single_match(prefix, matches)
    }

    /// Zero/one/many policy shared by every prefix lookup.
    pub(crate) fn single_match(
        &self,
        prefix: &str,
        mut matches: Vec<InboxMessage>,
    ) -> Result<Option<InboxMessage>> {
        if prefix.is_empty() {
            return Ok(None);
        }
        match matches.len() {
            0 => Ok(None),
            1 => {
                self.attach_recipients(&mut matches)?;
                Ok(matches.pop())
            }
            n => Err(StoreError::AmbiguousPrefix {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Unread messages for `to_id` that no notification has been sent for
    /// yet, oldest first.
    pub fn get_unnotified(&self, to_id: &str) -> Result<Vec<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}, r.status, r.read_at
             FROM messages m
             JOIN recipients r ON r.message_id = m.id
             WHERE r.to_id = ?1 AND r.status = 'unread' AND r.notified_at IS NULL
             ORDER BY m.created_at ASC, m.rowid ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![to_id], row_to_inbox)?;
        let mut messages = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        self.attach_recipients(&mut messages)?;
        Ok(messages)
    }

    /// Most recent unread message for `to_id`.
    pub fn get_latest_unread(&self, to_id: &str) -> Result<Option<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}, r.status, r.read_at
             FROM messages m
             JOIN recipients r ON r.message_id = m.id
             WHERE r.to_id = ?1 AND r.status = 'unread'
             ORDER BY m.created_at DESC, m.rowid DESC
             LIMIT 1"
        );
        let latest = self
            .conn()
            .query_row(&sql, params![to_id], row_to_inbox)
            .optional()?;

        let mut latest: Vec<_> = latest.into_iter().collect();
        self.attach_recipients(&mut latest)?;
        Ok(latest.pop())
    }

    pub fn count_unread(&self, to_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM recipients WHERE to_id = ?1 AND status = 'unread'",
            params![to_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Every recipient row for `to_id`, whatever its status.
    pub fn count_inbox(&self, to_id: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM recipients WHERE to_id = ?1",
            params![to_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
