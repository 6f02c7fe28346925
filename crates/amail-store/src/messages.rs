use std::collections::HashMap;
use std::str::FromStr;

use amail_shared::error::ParseEnumError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, OptionalExtension, TransactionBehavior};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{InboxMessage, Message};

/// Message columns in the order [`row_to_message`] reads them. Queries alias
/// the messages table as `m`.
pub(crate) const MESSAGE_COLUMNS: &str = "m.id, m.from_id, m.subject, m.body, m.priority, \
     m.msg_type, m.thread_id, m.reply_to_id, m.created_at";

/// Upper bound on ids per `IN (...)` list, well under SQLite's variable limit.
const RECIPIENT_BATCH: usize = 500;

impl Database {
    /// Store a message and one unread recipient row per entry in
    /// `recipients`, all in one transaction.
    ///
    /// Either everything is written or nothing is. Recipients are stored in
    /// the order given; duplicates are not removed here and make the whole
    /// send fail.
    pub fn send_message(&mut self, message: &Message, recipients: &[String]) -> Result<()> {
        self.insert_message_with_recipients(message, recipients)
            .map_err(|source| StoreError::Send {
                id: message.id.clone(),
                source: Box::new(source),
            })?;

        tracing::debug!(
            id = %message.id,
            from = %message.from_id,
            recipients = recipients.len(),
            "message sent"
        );
        Ok(())
    }

    fn insert_message_with_recipients(
        &mut self,
        message: &Message,
        recipients: &[String],
    ) -> Result<()> {
        // IMMEDIATE takes the write lock up front, so contention is resolved by
        // the busy timeout at BEGIN rather than failing mid-transaction.
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO messages
                 (id, from_id, subject, body, priority, msg_type, thread_id, reply_to_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id,
                message.from_id,
                message.subject,
                message.body,
                message.priority.as_str(),
                message.msg_type.as_str(),
                message.thread_id,
                message.reply_to_id,
                format_timestamp(&message.created_at),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO recipients (message_id, to_id, status) VALUES (?1, ?2, 'unread')",
            )?;
            for to_id in recipients {
                stmt.execute(params![message.id, to_id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Exact-id lookup with the full recipient list and no recipient view.
    pub fn get_message(&self, id: &str) -> Result<Option<InboxMessage>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1");
        let message = self
            .conn()
            .query_row(&sql, params![id], row_to_message)
            .optional()?;

        self.with_recipients(message)
    }

    /// The one message, searched across the whole database, whose id starts
    /// with `prefix`.
    ///
    /// `Ok(None)` when nothing matches, [`StoreError::AmbiguousPrefix`] when
    /// more than one message does.
    pub fn find_message_by_prefix(&self, prefix: &str) -> Result<Option<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m
             WHERE substr(m.id, 1, length(?1)) = ?1"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![prefix], row_to_message)?;
        let matches = rows
            .map(|row| row.map(InboxMessage::unscoped))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.single_match(prefix, matches)
    }

    fn with_recipients(&self, message: Option<Message>) -> Result<Option<InboxMessage>> {
        let Some(message) = message else {
            return Ok(None);
        };
        let mut found = vec![InboxMessage::unscoped(message)];
        self.attach_recipients(&mut found)?;
        Ok(found.pop())
    }

    /// Fill `to_ids` for every message with batched `IN (...)` queries.
    pub(crate) fn attach_recipients(&self, messages: &mut [InboxMessage]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let ids: Vec<&str> = messages.iter().map(|m| m.message.id.as_str()).collect();
        let mut by_message: HashMap<String, Vec<String>> = HashMap::new();

        for chunk in ids.chunks(RECIPIENT_BATCH) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT message_id, to_id FROM recipients
                 WHERE message_id IN ({placeholders})
                 ORDER BY rowid"
            );
            let mut stmt = self.conn().prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (message_id, to_id) = row?;
                by_message.entry(message_id).or_default().push(to_id);
            }
        }

        for msg in messages.iter_mut() {
            msg.to_ids = by_message.get(&msg.message.id).cloned().unwrap_or_default();
        }
        Ok(())
    }
}

impl InboxMessage {
    /// Wrap a message loaded without a recipient view.
    pub(crate) fn unscoped(message: Message) -> Self {
        Self {
            message,
            to_ids: Vec::new(),
            status: None,
            read_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Canonical stored form: UTC with nine fractional digits, so text order is
/// time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let priority: String = row.get(4)?;
    let msg_type: String = row.get(5)?;
    let created_at: String = row.get(8)?;

    Ok(Message {
        id: row.get(0)?,
        from_id: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        priority: parse_enum(4, &priority)?,
        msg_type: parse_enum(5, &msg_type)?,
        thread_id: row.get(6)?,
        reply_to_id: row.get(7)?,
        created_at: parse_timestamp(8, &created_at)?,
    })
}

/// [`MESSAGE_COLUMNS`] followed by `r.status, r.read_at`.
pub(crate) fn row_to_inbox(row: &rusqlite::Row<'_>) -> rusqlite::Result<InboxMessage> {
    let message = row_to_message(row)?;
    let status: String = row.get(9)?;
    let read_at: Option<String> = row.get(10)?;

    Ok(InboxMessage {
        message,
        to_ids: Vec::new(),
        status: Some(parse_enum(9, &status)?),
        read_at: read_at.map(|raw| parse_timestamp(10, &raw)).transpose()?,
    })
}
