//! Reply construction and thread reconstruction.
//!
//! Every reply records the thread root in `thread_id` and its direct parent
//! in `reply_to_id`. Reading a thread flattens whatever tree that forms into
//! one list ordered by `created_at`.

use amail_shared::MessageType;
use thiserror::Error;

use crate::database::Database;
use crate::error::Result;
use crate::messages::{row_to_message, MESSAGE_COLUMNS};
use crate::models::{InboxMessage, Message};

/// Why a reply has nobody to go to.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("cannot reply to your own message without --all")]
    OwnMessage,

    #[error("no recipients for reply")]
    NoRecipients,
}

impl Message {
    /// A reply to `parent`, joining the parent's thread or starting one
    /// rooted at the parent.
    ///
    /// The subject gains a `RE: ` prefix unless it already starts with `re:`
    /// in any case. Replies default to the `response` type.
    pub fn reply_to(parent: &Message, from_id: impl Into<String>, body: impl Into<String>) -> Self {
        let subject = if parent.subject.to_lowercase().starts_with("re:") {
            parent.subject.clone()
        } else {
            format!("RE: {}", parent.subject)
        };

        let mut reply = Message::compose(from_id, subject, body).with_type(MessageType::Response);
        reply.thread_id = Some(parent.thread_root().to_string());
        reply.reply_to_id = Some(parent.id.clone());
        reply
    }
}

/// Recipients of a reply from `me` to `parent`.
///
/// Plain replies go to the parent's sender. With `all`, the sender and every
/// original recipient, minus `me`, in first-seen order.
pub fn reply_recipients(
    parent: &InboxMessage,
    me: &str,
    all: bool,
) -> std::result::Result<Vec<String>, ReplyError> {
    if !all {
        if parent.from_id == me {
            return Err(ReplyError::OwnMessage);
        }
        return Ok(vec![parent.from_id.clone()]);
    }

    let mut recipients: Vec<String> = Vec::new();
    for role in std::iter::once(&parent.from_id).chain(parent.to_ids.iter()) {
        if role != me && !recipients.contains(role) {
            recipients.push(role.clone());
        }
    }

    if recipients.is_empty() {
        return Err(ReplyError::NoRecipients);
    }
    Ok(recipients)
}

impl Database {
    /// The root message and every message whose `thread_id` is `root_id`,
    /// oldest first.
    ///
    /// Not scoped to any recipient: messages one reader archived or deleted
    /// still appear.
    pub fn get_thread(&self, root_id: &str) -> Result<Vec<InboxMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages m
             WHERE m.id = ?1 OR m.thread_id = ?1
             ORDER BY m.created_at ASC, m.rowid ASC"
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map([root_id], row_to_message)?;
        let mut messages = rows
            .map(|row| row.map(InboxMessage::unscoped))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.attach_recipients(&mut messages)?;
        Ok(messages)
    }
}
